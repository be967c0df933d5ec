//! Point and frame types flowing through the emulator pipeline.
//!
//! Two point representations exist:
//! - [`LaserPoint`]: what the frame generator emits and a real DAC would receive.
//!   Fixed-point signed 16-bit coordinates, 8-bit color, laser on/off flag.
//! - [`SimPoint`]: where the simulated beam actually was at one simulation step.
//!   Normalized float coordinates (-1.0 to 1.0), color taken from the target.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest representable device coordinate magnitude.
pub const FULL_SCALE: f32 = 32767.0;

/// Divisor mapping a device coordinate to a fraction of the mirror range.
pub const COORD_DIVISOR: f32 = 32768.0;

bitflags! {
    /// Per-point flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct PointFlags: u8 {
        /// Laser is on at this point.
        const ON = 0x01;
        /// Point belongs to a corner braking/dwell tail.
        const DWELL = 0x02;
    }
}

/// A point in the DAC output stream.
///
/// Coordinates are fixed-point, symmetric around zero:
/// - x: -32767 (left) to 32767 (right)
/// - y: -32767 (bottom) to 32767 (top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaserPoint {
    pub x: i16,
    pub y: i16,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub flags: PointFlags,
}

impl LaserPoint {
    /// Creates a lit point.
    pub fn new(x: i16, y: i16, r: u8, g: u8, b: u8) -> Self {
        Self {
            x,
            y,
            r,
            g,
            b,
            flags: PointFlags::ON,
        }
    }

    /// Creates a blanked point (laser off) at the given position.
    pub fn blanked(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    /// Returns true if the laser is on at this point.
    pub fn is_on(&self) -> bool {
        self.flags.contains(PointFlags::ON)
    }
}

/// An ordered sequence of laser points. Order is playback order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaserFrame {
    pub points: Vec<LaserPoint>,
}

impl LaserFrame {
    pub fn new(points: Vec<LaserPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LaserPoint> {
        self.points.iter()
    }

    /// Number of lit points.
    pub fn lit_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_on()).count()
    }
}

impl From<Vec<LaserPoint>> for LaserFrame {
    fn from(points: Vec<LaserPoint>) -> Self {
        Self { points }
    }
}

/// The simulated beam at one simulation step.
///
/// Coordinates are normalized: x and y in -1.0 to 1.0, +y up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimPoint {
    pub x: f32,
    pub y: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub flags: PointFlags,
}

impl SimPoint {
    /// Returns true if the laser was on at this step.
    pub fn is_on(&self) -> bool {
        self.flags.contains(PointFlags::ON)
    }
}

/// The simulated trajectory for one laser frame, one point per simulation step.
///
/// The length is not predictable from the source frame: it depends on how
/// quickly the mirrors settle at each target.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimFrame {
    pub points: Vec<SimPoint>,
}

impl SimFrame {
    pub fn new(points: Vec<SimPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SimPoint> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laser_point_blanked_is_off_and_black() {
        let p = LaserPoint::blanked(100, -200);
        assert_eq!(p.x, 100);
        assert_eq!(p.y, -200);
        assert_eq!((p.r, p.g, p.b), (0, 0, 0));
        assert!(!p.is_on());
    }

    #[test]
    fn test_laser_point_new_is_on() {
        let p = LaserPoint::new(0, 0, 255, 0, 0);
        assert!(p.is_on());
        assert!(!p.flags.contains(PointFlags::DWELL));
    }

    #[test]
    fn test_laser_frame_lit_count() {
        let frame = LaserFrame::new(vec![
            LaserPoint::blanked(0, 0),
            LaserPoint::new(1, 1, 255, 255, 255),
            LaserPoint::new(2, 2, 255, 255, 255),
        ]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.lit_count(), 2);
    }
}
