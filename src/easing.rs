//! Corner braking: the easing applied at the end of sharp strokes.
//!
//! Real mirrors cannot stop instantly. At a hard corner the point stream slows
//! down along an ease-out curve and then dwells on the vertex so the mirrors
//! can settle before the next stroke starts. Smooth joins (curves, tangent
//! continuations) skip the tail entirely.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a stroke ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointSharpness {
    /// Hard corner: brake and dwell at the end point.
    #[default]
    Sharp,
    /// Smooth continuation: no tail.
    Smooth,
}

impl PointSharpness {
    /// The tail to append for this sharpness, if any.
    pub fn tail(self, corner: &CornerTail) -> Option<CornerTail> {
        match self {
            PointSharpness::Sharp => Some(*corner),
            PointSharpness::Smooth => None,
        }
    }
}

/// Easing curve mapping 0–1 to 0–1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Easing {
    Linear,
    /// Exponential ease-out: `1 - 2^(-exponent·t)`, pinned to 1 at t=1.
    ExpoOut { exponent: f32 },
}

impl Easing {
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Easing::Linear => t,
            Easing::ExpoOut { exponent } => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-exponent * t)
                }
            }
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::ExpoOut { exponent: 10.0 }
    }
}

/// Braking and dwell points appended after a sharp stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CornerTail {
    /// Points easing from the last regular step to the end point.
    pub braking_points: usize,
    /// Points repeated exactly at the end point.
    pub dwell_points: usize,
    pub easing: Easing,
}

impl Default for CornerTail {
    fn default() -> Self {
        Self {
            braking_points: 6,
            dwell_points: 4,
            easing: Easing::default(),
        }
    }
}

impl CornerTail {
    /// Total points the tail adds.
    pub fn len(&self) -> usize {
        self.braking_points + self.dwell_points
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path parameters of the tail points, starting after `base_t`.
    ///
    /// Braking parameters rise from `base_t` towards 1.0 along the easing
    /// curve; dwell parameters are exactly 1.0.
    pub fn params(&self, base_t: f32) -> impl Iterator<Item = f32> + '_ {
        let braking = self.braking_points;
        let braking_params = (1..=braking).map(move |i| {
            let s = i as f32 / braking as f32;
            base_t + (1.0 - base_t) * self.easing.apply(s)
        });
        braking_params.chain(std::iter::repeat(1.0).take(self.dwell_points))
    }
}
