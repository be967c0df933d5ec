//! Shape helpers built on top of [`FrameGenerator`].
//!
//! Outlines are drawn the way a laser show wants them: a blanked, sharp
//! approach to the first vertex so the mirrors settle before the beam turns
//! on, then sharp lit edges so corners stay crisp.

use std::f32::consts::TAU;

use glam::Vec2;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::LaserColor;
use crate::easing::PointSharpness;
use crate::generator::{ArcDirection, FrameGenerator, LaserState};
use crate::geometry::{self, Point2D, Transform2D};

/// Corners of a unit square centered on the origin, counterclockwise from bottom-left.
const UNIT_SQUARE: [Point2D; 4] = [
    Vec2::new(-0.5, -0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(0.5, 0.5),
    Vec2::new(-0.5, 0.5),
];

/// Draws common outlines into a borrowed [`FrameGenerator`].
pub struct ShapeBuilder<'a> {
    gen: &'a mut FrameGenerator,
}

impl<'a> ShapeBuilder<'a> {
    pub fn new(gen: &'a mut FrameGenerator) -> Self {
        Self { gen }
    }

    /// Axis-aligned square outline.
    pub fn square(&mut self, center: Point2D, size: f32, color: LaserColor) {
        let transform = geometry::transform(size, 0.0, center);
        self.polygon(&UNIT_SQUARE, &transform, color);
    }

    /// Closed polygon outline through `transform`.
    ///
    /// Blanks to the first vertex, then draws sharp edges back around to it.
    /// Fewer than two vertices draws nothing.
    pub fn polygon(&mut self, outline: &[Point2D], transform: &Transform2D, color: LaserColor) {
        if outline.len() < 2 {
            return;
        }

        let first = transform.transform_point2(outline[0]);
        self.approach(first);
        for &vertex in outline[1..].iter() {
            self.gen.line_to(
                transform.transform_point2(vertex),
                LaserState::On,
                PointSharpness::Sharp,
                color,
            );
        }
        self.gen
            .line_to(first, LaserState::On, PointSharpness::Sharp, color);
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`.
    ///
    /// `rotation` (radians) turns the first vertex away from +x.
    pub fn regular_polygon(
        &mut self,
        center: Point2D,
        radius: f32,
        sides: usize,
        rotation: f32,
        color: LaserColor,
    ) {
        if sides < 3 {
            return;
        }
        let outline = regular_polygon_vertices(sides, radius, rotation);
        let transform = geometry::transform(1.0, 0.0, center);
        self.polygon(&outline, &transform, color);
    }

    /// Circle drawn as two counterclockwise half-arcs starting at +x.
    pub fn circle(&mut self, center: Point2D, radius: f32, color: LaserColor) {
        let right = center + Vec2::new(radius, 0.0);
        let left = center - Vec2::new(radius, 0.0);

        self.approach(right);
        self.gen.arc_to(
            center,
            left,
            LaserState::On,
            PointSharpness::Smooth,
            color,
            ArcDirection::CounterClockwise,
        );
        self.gen.arc_to(
            center,
            right,
            LaserState::On,
            PointSharpness::Sharp,
            color,
            ArcDirection::CounterClockwise,
        );
    }

    /// Open curve through precomputed points, e.g. a [`coupler_curve`].
    pub fn curve(&mut self, points: &[Point2D], transform: &Transform2D, color: LaserColor) {
        let Some(&first) = points.first() else {
            return;
        };
        self.approach(transform.transform_point2(first));
        let placed: Vec<Point2D> = points
            .iter()
            .map(|&p| transform.transform_point2(p))
            .collect();
        self.gen.draw_shape(&placed, color);
    }

    fn approach(&mut self, target: Point2D) {
        self.gen.line_to(
            target,
            LaserState::Off,
            PointSharpness::Sharp,
            LaserColor::solid(0.0, 0.0, 0.0),
        );
    }
}

/// Vertices of a regular polygon centered on the origin.
pub fn regular_polygon_vertices(sides: usize, radius: f32, rotation: f32) -> Vec<Point2D> {
    (0..sides)
        .map(|i| {
            let angle = rotation + TAU * i as f32 / sides as f32;
            geometry::rotate(Vec2::new(radius, 0.0), angle)
        })
        .collect()
}

// =============================================================================
// Four-bar linkage
// =============================================================================

/// A planar four-bar linkage.
///
/// Ground pivots sit at the origin (crank side) and at `(ground, 0)` (rocker
/// side). The coupler point is expressed in the coupler link's own frame: x
/// along the link from the crank joint towards the rocker joint, y to its left.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FourBarLinkage {
    pub ground: f32,
    pub crank: f32,
    pub coupler: f32,
    pub rocker: f32,
    pub coupler_point: Point2D,
}

impl Default for FourBarLinkage {
    fn default() -> Self {
        Self {
            ground: 4.0,
            crank: 1.0,
            coupler: 3.0,
            rocker: 3.5,
            coupler_point: Vec2::new(1.5, 1.0),
        }
    }
}

impl FourBarLinkage {
    pub fn new(ground: f32, crank: f32, coupler: f32, rocker: f32) -> Self {
        Self {
            ground,
            crank,
            coupler,
            rocker,
            coupler_point: Vec2::new(coupler * 0.5, 0.0),
        }
    }

    /// Set the coupler point (builder pattern).
    pub fn with_coupler_point(mut self, point: Point2D) -> Self {
        self.coupler_point = point;
        self
    }

    /// Grashof condition: the shortest link can rotate fully.
    pub fn is_grashof(&self) -> bool {
        let mut links = [self.ground, self.crank, self.coupler, self.rocker];
        links.sort_by(f32::total_cmp);
        links[0] + links[3] <= links[1] + links[2]
    }

    /// Coupler point position at `crank_angle` (radians), or `None` where the
    /// linkage cannot be assembled.
    pub fn position(&self, crank_angle: f32) -> Option<Point2D> {
        let crank_joint = geometry::rotate(Vec2::new(self.crank, 0.0), crank_angle);
        let rocker_pivot = Vec2::new(self.ground, 0.0);

        let rocker_joint =
            circle_intersection(crank_joint, self.coupler, rocker_pivot, self.rocker)?;

        let along = geometry::normalized(rocker_joint - crank_joint);
        let left = along.perp();
        Some(crank_joint + along * self.coupler_point.x + left * self.coupler_point.y)
    }
}

/// Samples the coupler curve over one crank revolution.
///
/// When the linkage assembles at every sample the list is closed: the first
/// point is repeated at the end. Crank angles where the linkage cannot be
/// assembled are skipped and the list stays open, so a non-Grashof linkage
/// yields the reachable arcs only.
pub fn coupler_curve(linkage: &FourBarLinkage, samples: usize) -> Vec<Point2D> {
    let mut points: Vec<Point2D> = (0..samples)
        .filter_map(|i| linkage.position(TAU * i as f32 / samples as f32))
        .collect();
    if points.len() == samples {
        if let Some(&first) = points.first() {
            points.push(first);
        }
    }
    points
}

/// Coupler curve scaled and centered to fit within a circle of `radius`
/// around the origin.
pub fn fitted_coupler_curve(linkage: &FourBarLinkage, samples: usize, radius: f32) -> Vec<Point2D> {
    let points = coupler_curve(linkage, samples);
    let Some(&first) = points.first() else {
        return points;
    };

    let (min, max) = points
        .iter()
        .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    let center = (min + max) * 0.5;
    let half_extent = points
        .iter()
        .map(|&p| (p - center).length())
        .fold(0.0f32, f32::max);
    if half_extent <= 0.0 {
        return vec![Vec2::ZERO; points.len()];
    }

    let scale = radius / half_extent;
    points.into_iter().map(|p| (p - center) * scale).collect()
}

/// Intersection of two circles, picking the one to the left of `a -> b`.
fn circle_intersection(a: Point2D, ra: f32, b: Point2D, rb: f32) -> Option<Point2D> {
    let d = a.distance(b);
    if d <= 0.0 || d > ra + rb || d < (ra - rb).abs() {
        return None;
    }
    let along = (ra * ra - rb * rb + d * d) / (2.0 * d);
    let height = (ra * ra - along * along).max(0.0).sqrt();
    let dir = (b - a) / d;
    Some(a + dir * along + dir.perp() * height)
}
