//! 2D point utilities.
//!
//! Drawing coordinates are normalized: x and y in -1.0 to 1.0, +y up. Points
//! are plain `glam` vectors; affine transforms (scale, rotation, translation)
//! are `glam::Affine2`.

use glam::{Affine2, Vec2};

/// A 2D point or vector in drawing space.
pub type Point2D = Vec2;

/// An affine 2D transform applied to shape outlines.
pub type Transform2D = Affine2;

/// Lengths below this are treated as zero when normalizing.
pub const NORMALIZE_EPSILON: f32 = 1e-9;

/// Rotates `p` counterclockwise about the origin by `angle` radians.
pub fn rotate(p: Point2D, angle: f32) -> Point2D {
    Vec2::from_angle(angle).rotate(p)
}

/// Returns the unit vector in the direction of `p`, or zero for (near-)zero input.
pub fn normalized(p: Point2D) -> Point2D {
    let len = p.length();
    if len < NORMALIZE_EPSILON || !len.is_finite() {
        Vec2::ZERO
    } else {
        p / len
    }
}

/// Builds a transform from scale, rotation (radians) and translation.
pub fn transform(scale: f32, angle: f32, translation: Point2D) -> Transform2D {
    Affine2::from_scale_angle_translation(Vec2::splat(scale), angle, translation)
}
