//! Optical distortion between mirror angles and a flat projection screen.
//!
//! A galvo pair deflects the beam by an angle, but a flat screen at distance
//! `d` shows the spot at `d * tan(angle)`. Equal angle steps therefore land
//! further apart near the edges ("pincushion"). The frame generator pre-warps
//! drawing coordinates with [`correct`] so that the simulator's forward
//! mapping, [`angle_to_screen`], lands every point back where it was drawn.
//!
//! Both directions normalize so that the full mirror deflection `max_angle`
//! maps to screen radius 1.0.

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;

/// Mirror angles at or below this (degrees) are treated as degenerate.
const MIN_MAX_ANGLE: f32 = 1e-3;

/// Radial polynomial pre-warp for lens/screen correction.
///
/// `factor = 1 + k1·r² + k2·r⁴ + k3·r⁶`, applied to drawing coordinates before
/// the tangent correction. All-zero coefficients are the identity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RadialDistortion {
    pub k1: f32,
    pub k2: f32,
    pub k3: f32,
}

impl RadialDistortion {
    pub fn new(k1: f32, k2: f32, k3: f32) -> Self {
        Self { k1, k2, k3 }
    }

    pub fn is_identity(&self) -> bool {
        self.k1 == 0.0 && self.k2 == 0.0 && self.k3 == 0.0
    }

    pub fn apply(&self, p: Point2D) -> Point2D {
        if self.is_identity() {
            return p;
        }
        let r2 = p.length_squared();
        let factor = 1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2;
        p * factor
    }
}

/// Screen scale factor for a mirror range: `1 / tan(max_angle)`.
///
/// Returns 1.0 for a degenerate (zero or negative) range.
pub fn screen_scale(max_angle_deg: f32) -> f32 {
    if max_angle_deg <= MIN_MAX_ANGLE {
        return 1.0;
    }
    1.0 / (max_angle_deg * DEG_TO_RAD).tan()
}

/// Pre-warps a normalized screen position into a mirror-angle fraction.
///
/// The result, multiplied by `max_angle_deg`, is the deflection (per axis,
/// preserving direction) that [`angle_to_screen`] maps back to `p`.
pub fn correct(p: Point2D, max_angle_deg: f32) -> Point2D {
    if max_angle_deg <= MIN_MAX_ANGLE {
        return p;
    }
    let r = p.length();
    if r == 0.0 {
        return Vec2::ZERO;
    }
    let theta = p.y.atan2(p.x);

    let max_rad = max_angle_deg * DEG_TO_RAD;
    let corrected_deg = (r * max_rad.tan()).atan() / DEG_TO_RAD;
    let corrected_r = corrected_deg / max_angle_deg;

    Vec2::new(corrected_r * theta.cos(), corrected_r * theta.sin())
}

/// Maps a mirror deflection (degrees per axis) to a normalized screen position.
///
/// `scale` is [`screen_scale`] for the mirror range.
pub fn angle_to_screen(angle_x: f32, angle_y: f32, scale: f32) -> Point2D {
    let r_deg = (angle_x * angle_x + angle_y * angle_y).sqrt();
    if r_deg == 0.0 {
        return Vec2::ZERO;
    }
    let theta = angle_y.atan2(angle_x);
    let screen_r = (r_deg * DEG_TO_RAD).tan() * scale;
    Vec2::new(screen_r * theta.cos(), screen_r * theta.sin())
}
