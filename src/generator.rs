//! Vector-to-point frame generation.
//!
//! [`FrameGenerator`] turns drawing calls (lines, arcs, explicit point lists)
//! into the dense, ordered point stream a laser DAC plays back. Segments are
//! subdivided so consecutive points are roughly `average_point_spacing` apart
//! regardless of segment length, which keeps apparent brightness and scan
//! speed uniform on real hardware.
//!
//! Every emitted point is scaled to the usable extent, pre-warped for the
//! flat-screen distortion (see [`crate::distortion`]) and clamped to the
//! device coordinate range.
//!
//! # Example
//!
//! ```
//! use laser_emu::{FrameGenerator, LaserColor, LaserState, PointSharpness, Point2D};
//!
//! let mut gen = FrameGenerator::default();
//! gen.new_frame();
//! gen.blank_to(Point2D::new(-0.5, -0.5));
//! let red = LaserColor::solid(0.0, 1.0, 1.0);
//! gen.line_to(Point2D::new(0.5, -0.5), LaserState::On, PointSharpness::Sharp, red);
//! assert!(!gen.frame().is_empty());
//! ```

use std::f32::consts::TAU;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::{LaserColor, Rgb8};
use crate::distortion::{self, RadialDistortion};
use crate::easing::{CornerTail, PointSharpness};
use crate::geometry::{self, Point2D};
use crate::types::{LaserFrame, LaserPoint, PointFlags, FULL_SCALE};

/// Upper bound on subdivisions of a single segment.
///
/// Keeps a zero or tiny `average_point_spacing` from exhausting memory.
pub const MAX_SEGMENT_STEPS: usize = 1 << 16;

/// Whether the beam is lit while travelling a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LaserState {
    On,
    Off,
}

impl LaserState {
    fn flags(self) -> PointFlags {
        match self {
            LaserState::On => PointFlags::ON,
            LaserState::Off => PointFlags::empty(),
        }
    }
}

/// Arc sweep direction, in drawing space (+y up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

/// Frame generator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneratorConfig {
    /// Mechanical half-range of the mirrors in degrees. Must match the simulator.
    pub max_angle: f32,
    /// Usable fraction of the full deflection (0–1).
    pub max_extent: f32,
    /// Target distance between consecutive points, in drawing units.
    pub average_point_spacing: f32,
    /// Radial pre-warp applied before the tangent correction.
    pub distortion: RadialDistortion,
    /// Braking/dwell tail appended to sharp strokes.
    pub corner_tail: CornerTail,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_angle: 20.0,
            max_extent: 0.8,
            average_point_spacing: 0.025,
            distortion: RadialDistortion::default(),
            corner_tail: CornerTail::default(),
        }
    }
}

impl GeneratorConfig {
    /// Create a configuration for the given mirror half-range in degrees.
    pub fn new(max_angle: f32) -> Self {
        Self {
            max_angle,
            ..Default::default()
        }
    }

    /// Set the usable fraction of the full deflection (builder pattern).
    pub fn with_max_extent(mut self, max_extent: f32) -> Self {
        self.max_extent = max_extent;
        self
    }

    /// Set the target point spacing in drawing units (builder pattern).
    pub fn with_point_spacing(mut self, spacing: f32) -> Self {
        self.average_point_spacing = spacing;
        self
    }

    /// Set the radial distortion coefficients (builder pattern).
    pub fn with_distortion(mut self, distortion: RadialDistortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// Set the corner tail used by sharp strokes (builder pattern).
    pub fn with_corner_tail(mut self, corner_tail: CornerTail) -> Self {
        self.corner_tail = corner_tail;
        self
    }

    /// Largest device coordinate a drawing-space unit maps to before correction.
    pub fn max_value(&self) -> f32 {
        FULL_SCALE * self.max_extent
    }
}

/// Builds one [`LaserFrame`] per output frame from drawing calls.
///
/// The pen position carries over between calls and across
/// [`new_frame`](Self::new_frame), so a path can continue seamlessly into the
/// next frame.
#[derive(Debug, Clone)]
pub struct FrameGenerator {
    config: GeneratorConfig,
    frame: LaserFrame,
    pen: Point2D,
}

impl Default for FrameGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl FrameGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            frame: LaserFrame::default(),
            pen: Vec2::ZERO,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    /// Clears the accumulated frame. The pen position is kept.
    pub fn new_frame(&mut self) {
        self.frame.points.clear();
    }

    /// Current pen position in drawing space.
    pub fn pen(&self) -> Point2D {
        self.pen
    }

    /// The frame built so far.
    pub fn frame(&self) -> &LaserFrame {
        &self.frame
    }

    /// Takes the frame built so far, leaving an empty one.
    pub fn take_frame(&mut self) -> LaserFrame {
        std::mem::take(&mut self.frame)
    }

    /// Draws a straight segment from the pen to `target`.
    pub fn line_to(
        &mut self,
        target: Point2D,
        state: LaserState,
        sharpness: PointSharpness,
        color: LaserColor,
    ) {
        let start = self.pen;
        let steps = self.step_count(start.distance(target));
        let points = self.sample_segment(steps, state, sharpness, &color, |t| start.lerp(target, t));

        log::trace!(
            "line_to ({:.3}, {:.3}) -> ({:.3}, {:.3}): {} steps, {} points",
            start.x,
            start.y,
            target.x,
            target.y,
            steps,
            points.len()
        );

        self.frame.points.extend(points);
        self.pen = target;
    }

    /// Moves the pen to `target` with the laser off.
    pub fn blank_to(&mut self, target: Point2D) {
        self.line_to(
            target,
            LaserState::Off,
            PointSharpness::Smooth,
            LaserColor::solid(0.0, 0.0, 0.0),
        );
    }

    /// Draws a circular arc around `center` from the pen towards `target`.
    ///
    /// The radius is the pen's distance from `center`; `target` only selects the
    /// end angle. When the pen already lies on the end angle the arc is a full
    /// turn. The pen ends on the arc at the end angle.
    pub fn arc_to(
        &mut self,
        center: Point2D,
        target: Point2D,
        state: LaserState,
        sharpness: PointSharpness,
        color: LaserColor,
        direction: ArcDirection,
    ) {
        let radius_start = self.pen - center;
        let radius_end = target - center;
        let radius = radius_start.length();

        let start_angle = radius_start.y.atan2(radius_start.x);
        let end_angle = radius_end.y.atan2(radius_end.x);
        let sweep = resolve_sweep(end_angle - start_angle, direction);

        let steps = self.step_count((sweep * radius).abs());
        let points = self.sample_segment(steps, state, sharpness, &color, |t| {
            center + geometry::rotate(radius_start, sweep * t)
        });

        log::trace!(
            "arc_to center ({:.3}, {:.3}) radius {:.3} sweep {:.3} rad: {} steps, {} points",
            center.x,
            center.y,
            radius,
            sweep,
            steps,
            points.len()
        );

        self.frame.points.extend(points);
        self.pen = center + geometry::rotate(radius_start, sweep);
    }

    /// Plays back an explicit point list with the laser on.
    ///
    /// Color follows the index fraction `i / len`. The pen moves to the last
    /// point. An empty list is a no-op.
    pub fn draw_shape(&mut self, points: &[Point2D], color: LaserColor) {
        let Some(&last) = points.last() else {
            return;
        };

        let len = points.len() as f32;
        let emitted: Vec<LaserPoint> = points
            .iter()
            .enumerate()
            .map(|(i, &p)| self.emit(p, color.evaluate(i as f32 / len), PointFlags::ON))
            .collect();

        self.frame.points.extend(emitted);
        self.pen = last;
    }

    /// Converts a drawing-space point to a device point.
    ///
    /// Clamps each axis to the drawing range, scales to the usable extent,
    /// applies the radial and tangent corrections, then clamps to the device
    /// coordinate range.
    pub fn to_device(&self, p: Point2D) -> (i16, i16) {
        let p = p.clamp(Vec2::NEG_ONE, Vec2::ONE);
        let screen = self.config.distortion.apply(p * self.config.max_extent);
        let fraction = distortion::correct(screen, self.config.max_angle);
        let x = (fraction.x * FULL_SCALE).clamp(-FULL_SCALE, FULL_SCALE);
        let y = (fraction.y * FULL_SCALE).clamp(-FULL_SCALE, FULL_SCALE);
        (x as i16, y as i16)
    }

    fn emit(&self, p: Point2D, rgb: Rgb8, flags: PointFlags) -> LaserPoint {
        let (x, y) = self.to_device(p);
        LaserPoint {
            x,
            y,
            r: rgb.r,
            g: rgb.g,
            b: rgb.b,
            flags,
        }
    }

    /// `max(1, ceil(length / spacing))`, bounded by [`MAX_SEGMENT_STEPS`].
    fn step_count(&self, length: f32) -> usize {
        let raw = (length / self.config.average_point_spacing).ceil();
        if raw >= 1.0 {
            raw.min(MAX_SEGMENT_STEPS as f32) as usize
        } else {
            1
        }
    }

    /// Samples a parametric segment: regular steps, then the corner tail if sharp.
    ///
    /// Returns all points for the segment; callers append them in one go.
    fn sample_segment(
        &self,
        steps: usize,
        state: LaserState,
        sharpness: PointSharpness,
        color: &LaserColor,
        at: impl Fn(f32) -> Point2D,
    ) -> Vec<LaserPoint> {
        let flags = state.flags();
        let tail = sharpness.tail(&self.config.corner_tail);
        // A sharp stroke's last regular step is replaced by the braking tail.
        let base_steps = if tail.is_some() { steps - 1 } else { steps };

        let mut points =
            Vec::with_capacity(base_steps + 1 + tail.as_ref().map_or(0, CornerTail::len));

        for i in 0..=base_steps {
            let t = i as f32 / steps as f32;
            points.push(self.emit(at(t), color.evaluate(t), flags));
        }

        if let Some(tail) = tail {
            let base_t = (steps - 1) as f32 / steps as f32;
            for t in tail.params(base_t) {
                points.push(self.emit(at(t), color.evaluate(t), flags | PointFlags::DWELL));
            }
        }

        points
    }
}

/// Resolves a raw angle difference into a sweep in the requested direction.
fn resolve_sweep(raw: f32, direction: ArcDirection) -> f32 {
    match direction {
        ArcDirection::CounterClockwise if raw <= 0.0 => raw + TAU,
        ArcDirection::Clockwise if raw >= 0.0 => raw - TAU,
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distortion::{angle_to_screen, screen_scale};
    use crate::types::COORD_DIVISOR;

    fn white() -> LaserColor {
        LaserColor::solid(0.0, 0.0, 1.0)
    }

    fn generator(spacing: f32) -> FrameGenerator {
        FrameGenerator::new(
            GeneratorConfig::new(20.0)
                .with_max_extent(1.0)
                .with_point_spacing(spacing),
        )
    }

    #[test]
    fn test_smooth_line_has_steps_plus_one_points() {
        let mut gen = generator(0.125);
        gen.line_to(Vec2::new(1.0, 0.0), LaserState::On, PointSharpness::Smooth, white());
        assert_eq!(gen.frame().len(), 9);
    }

    #[test]
    fn test_sharp_line_appends_braking_and_dwell() {
        let mut gen = generator(0.125);
        gen.line_to(Vec2::new(1.0, 0.0), LaserState::On, PointSharpness::Sharp, white());
        // 8 regular points (t = 0..7/8), 6 braking, 4 dwell
        assert_eq!(gen.frame().len(), 8 + 6 + 4);

        let points = &gen.frame().points;
        let dwell = &points[points.len() - 4..];
        assert!(dwell.iter().all(|p| *p == dwell[0]), "dwell points sit on the target");
        assert!(dwell.iter().all(|p| p.flags.contains(PointFlags::DWELL | PointFlags::ON)));
        assert!(!points[0].flags.contains(PointFlags::DWELL));
    }

    #[test]
    fn test_line_unit_spacing_point_count_and_monotonic_x() {
        let mut gen = generator(0.1);
        gen.line_to(Vec2::new(1.0, 0.0), LaserState::On, PointSharpness::Smooth, white());
        let n = gen.frame().len();
        assert!((11..=12).contains(&n), "expected ~10 intervals, got {} points", n);

        let mut gen = generator(0.1);
        gen.line_to(Vec2::new(1.0, 0.0), LaserState::On, PointSharpness::Sharp, white());
        let points = &gen.frame().points;
        assert!((20..=21).contains(&points.len()), "got {} points", points.len());
        assert!(points.windows(2).all(|w| w[1].x >= w[0].x), "x must not decrease");
        assert!(points.iter().all(|p| p.y == 0));
    }

    #[test]
    fn test_zero_length_segment_degrades_to_one_step() {
        let mut gen = generator(0.1);
        gen.line_to(Vec2::ZERO, LaserState::On, PointSharpness::Smooth, white());
        assert_eq!(gen.frame().len(), 2);

        let mut gen = generator(0.0);
        gen.line_to(Vec2::ZERO, LaserState::On, PointSharpness::Sharp, white());
        assert_eq!(gen.frame().len(), 1 + 10);
    }

    #[test]
    fn test_zero_spacing_is_bounded() {
        let mut gen = generator(0.0);
        gen.line_to(Vec2::new(0.5, 0.0), LaserState::On, PointSharpness::Smooth, white());
        assert_eq!(gen.frame().len(), MAX_SEGMENT_STEPS + 1);
    }

    #[test]
    fn test_new_frame_clears_points_but_keeps_pen() {
        let mut gen = generator(0.1);
        gen.line_to(Vec2::new(0.3, 0.4), LaserState::On, PointSharpness::Smooth, white());
        gen.new_frame();
        assert!(gen.frame().is_empty());
        assert_eq!(gen.pen(), Vec2::new(0.3, 0.4));

        gen.line_to(Vec2::new(0.3, 0.4), LaserState::On, PointSharpness::Smooth, white());
        assert_eq!(gen.frame().len(), 2, "continues from the retained pen position");
    }

    #[test]
    fn test_blank_to_is_off() {
        let mut gen = generator(0.1);
        gen.blank_to(Vec2::new(-0.5, 0.5));
        assert!(gen.frame().iter().all(|p| !p.is_on()));
        assert_eq!(gen.pen(), Vec2::new(-0.5, 0.5));
    }

    #[test]
    fn test_line_colors_follow_gradient() {
        let mut gen = generator(0.25);
        let gradient = LaserColor::gradient(0.0, 120.0, 1.0, 1.0, 1.0, 1.0);
        gen.line_to(Vec2::new(1.0, 0.0), LaserState::On, PointSharpness::Smooth, gradient);
        let points = &gen.frame().points;
        let first = points.first().map(|p| (p.r, p.g, p.b));
        let last = points.last().map(|p| (p.r, p.g, p.b));
        assert_eq!(first, Some((255, 0, 0)));
        assert_eq!(last, Some((0, 255, 0)));
    }

    #[test]
    fn test_points_are_clamped_to_device_range() {
        // Strong barrel distortion pushes the corner past full deflection.
        let mut gen = FrameGenerator::new(
            GeneratorConfig::new(20.0)
                .with_max_extent(1.0)
                .with_point_spacing(0.5)
                .with_distortion(RadialDistortion::new(1.0, 0.0, 0.0)),
        );
        gen.line_to(Vec2::new(5.0, -5.0), LaserState::On, PointSharpness::Smooth, white());
        let last = gen.frame().points.last().copied().unwrap_or_default();
        assert_eq!(last.x, FULL_SCALE as i16);
        assert_eq!(last.y, -(FULL_SCALE as i16));
    }

    #[test]
    fn test_points_outside_drawing_range_stay_within_usable_extent() {
        let mut gen = FrameGenerator::default();
        let limit = gen.to_device(Vec2::new(1.0, 0.0)).0;
        assert!(limit < FULL_SCALE as i16, "0.8 extent must not reach full scale");

        gen.line_to(Vec2::new(2.0, 0.0), LaserState::On, PointSharpness::Smooth, white());
        let max_x = gen.frame().iter().map(|p| p.x).max().unwrap_or_default();
        assert_eq!(max_x, limit);

        gen.line_to(Vec2::new(-3.0, -3.0), LaserState::On, PointSharpness::Smooth, white());
        let last = gen.frame().points.last().copied().unwrap_or_default();
        assert_eq!((last.x, last.y), gen.to_device(Vec2::new(-1.0, -1.0)));
    }

    #[test]
    fn test_device_coordinates_map_back_to_drawing_position() {
        let gen = generator(0.1);
        let max_angle = gen.config().max_angle;
        let scale = screen_scale(max_angle);
        for &(x, y) in &[(0.25, 0.0), (-0.6, 0.3), (0.7, -0.7)] {
            let p = Vec2::new(x, y);
            let (dx, dy) = gen.to_device(p);
            let ax = dx as f32 / COORD_DIVISOR * max_angle;
            let ay = dy as f32 / COORD_DIVISOR * max_angle;
            let back = angle_to_screen(ax, ay, scale);
            assert!((back - p).length() < 1e-3, "{:?} -> {:?}", p, back);
        }
    }

    #[test]
    fn test_ccw_quarter_arc() {
        let mut gen = generator(0.05);
        gen.blank_to(Vec2::new(0.5, 0.0));
        gen.new_frame();
        gen.arc_to(
            Vec2::ZERO,
            Vec2::new(0.0, 0.5),
            LaserState::On,
            PointSharpness::Smooth,
            white(),
            ArcDirection::CounterClockwise,
        );
        // quarter circle of radius 0.5: length ~0.785, 16 steps
        assert_eq!(gen.frame().len(), 17);
        assert!((gen.pen() - Vec2::new(0.0, 0.5)).length() < 1e-5);
        // counterclockwise from +x passes through the first quadrant
        assert!(gen.frame().iter().all(|p| p.x >= 0 && p.y >= 0));
    }

    #[test]
    fn test_cw_arc_takes_long_way_round() {
        let mut gen = generator(0.05);
        gen.blank_to(Vec2::new(0.5, 0.0));
        gen.new_frame();
        gen.arc_to(
            Vec2::ZERO,
            Vec2::new(0.0, 0.5),
            LaserState::On,
            PointSharpness::Smooth,
            white(),
            ArcDirection::Clockwise,
        );
        // three quarters of the circle
        assert_eq!(gen.frame().len(), 49);
        assert!(gen.frame().iter().any(|p| p.y < -1000), "passes through the lower half");
    }

    #[test]
    fn test_arc_to_same_angle_is_full_circle() {
        let mut gen = generator(0.05);
        gen.blank_to(Vec2::new(0.5, 0.0));
        gen.new_frame();
        gen.arc_to(
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            LaserState::On,
            PointSharpness::Smooth,
            white(),
            ArcDirection::CounterClockwise,
        );
        assert_eq!(gen.frame().len(), 64);
        assert!((gen.pen() - Vec2::new(0.5, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_draw_shape_plays_points_in_order() {
        let mut gen = generator(0.1);
        let shape = [Vec2::new(0.1, 0.0), Vec2::new(0.2, 0.0), Vec2::new(0.3, 0.0)];
        gen.draw_shape(&shape, white());
        let points = &gen.frame().points;
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.is_on()));
        assert!(points[0].x < points[1].x && points[1].x < points[2].x);
        assert_eq!(gen.pen(), Vec2::new(0.3, 0.0));
    }

    #[test]
    fn test_draw_shape_empty_is_noop() {
        let mut gen = generator(0.1);
        gen.draw_shape(&[], white());
        assert!(gen.frame().is_empty());
        assert_eq!(gen.pen(), Vec2::ZERO);
    }

    #[test]
    fn test_take_frame_leaves_empty_frame() {
        let mut gen = generator(0.1);
        gen.line_to(Vec2::new(0.2, 0.0), LaserState::On, PointSharpness::Smooth, white());
        let frame = gen.take_frame();
        assert_eq!(frame.len(), 3);
        assert!(gen.frame().is_empty());
    }
}
