//! Demo scenes drawn into a frame generator.

use std::f32::consts::TAU;

use clap::ValueEnum;
use laser_emu::shapes::{fitted_coupler_curve, FourBarLinkage};
use laser_emu::{
    ArcDirection, ColorHsv, FrameGenerator, LaserColor, LaserState, Point2D, PointSharpness,
    ShapeBuilder, Transform2D,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scene {
    /// Axis-aligned square (sharp corners)
    Square,
    /// Circle from two half arcs
    Circle,
    /// Rotating hexagon
    Hexagon,
    /// Four-bar linkage coupler curve
    Coupler,
    /// Gradient star with arcs between the tips
    Star,
}

/// Draws one frame of `scene` at animation time `t` (seconds).
pub fn draw(scene: Scene, gen: &mut FrameGenerator, t: f32, color: ColorHsv) {
    let solid = color.to_laser_color();
    match scene {
        Scene::Square => ShapeBuilder::new(gen).square(Point2D::ZERO, 1.2, solid),
        Scene::Circle => ShapeBuilder::new(gen).circle(Point2D::ZERO, 0.7, solid),
        Scene::Hexagon => {
            ShapeBuilder::new(gen).regular_polygon(Point2D::ZERO, 0.75, 6, t * 0.5, solid)
        }
        Scene::Coupler => {
            let curve = fitted_coupler_curve(&FourBarLinkage::default(), 240, 0.8);
            ShapeBuilder::new(gen).curve(&curve, &Transform2D::IDENTITY, solid);
        }
        Scene::Star => draw_star(gen, t, color),
    }
}

fn draw_star(gen: &mut FrameGenerator, t: f32, color: ColorHsv) {
    const TIPS: usize = 5;
    let tip = |i: usize| {
        let angle = t * 0.3 + TAU * i as f32 / TIPS as f32;
        Point2D::new(angle.cos(), angle.sin()) * 0.8
    };

    let mut hue = color;
    gen.blank_to(tip(0));
    for i in 1..=TIPS {
        // pentagram: every second tip
        let next = tip((i * 2) % TIPS);
        let start = hue;
        hue.add_hue(360.0 / TIPS as f32);
        let gradient = LaserColor::gradient(
            start.hue(),
            hue.hue(),
            start.saturation(),
            hue.saturation(),
            start.value(),
            hue.value(),
        );
        gen.line_to(next, LaserState::On, PointSharpness::Sharp, gradient);
    }

    gen.blank_to(tip(0));
    for i in 1..=TIPS {
        gen.arc_to(
            Point2D::ZERO,
            tip(i % TIPS),
            LaserState::On,
            PointSharpness::Smooth,
            LaserColor::solid(color.hue() + 180.0, 0.6, 0.5),
            ArcDirection::CounterClockwise,
        );
    }
}
