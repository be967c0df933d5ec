//! HSV color model for laser strokes.
//!
//! A [`LaserColor`] is an immutable gradient in HSV space evaluated along a
//! stroke's path parameter. Hue takes the shortest way around the color wheel,
//! so a gradient from 350° to 10° passes through red instead of sweeping
//! through green and blue.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A hue/saturation/value gradient.
///
/// Hue is in degrees (0–360), saturation and value in 0–1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaserColor {
    h0: f32,
    h1: f32,
    s0: f32,
    s1: f32,
    v0: f32,
    v1: f32,
}

impl LaserColor {
    /// A constant color.
    pub fn solid(h: f32, s: f32, v: f32) -> Self {
        Self::gradient(h, h, s, s, v, v)
    }

    /// A gradient between two HSV endpoints.
    pub fn gradient(h0: f32, h1: f32, s0: f32, s1: f32, v0: f32, v1: f32) -> Self {
        Self {
            h0,
            h1,
            s0,
            s1,
            v0,
            v1,
        }
    }

    /// A gradient between two RGB endpoints, converted to HSV.
    pub fn from_rgb(start: Rgb8, end: Rgb8) -> Self {
        let (h0, s0, v0) = rgb_to_hsv(start);
        let (h1, s1, v1) = rgb_to_hsv(end);
        Self::gradient(h0, h1, s0, s1, v0, v1)
    }

    /// Evaluates the gradient at `t` (clamped to 0–1).
    pub fn evaluate(&self, t: f32) -> Rgb8 {
        let t = t.clamp(0.0, 1.0);
        let hue = self.lerp_hue(t);
        let sat = lerp(self.s0, self.s1, t);
        let val = lerp(self.v0, self.v1, t);
        hsv_to_rgb(hue, sat, val)
    }

    /// Color at the start of the gradient.
    pub fn start(&self) -> Rgb8 {
        self.evaluate(0.0)
    }

    /// Color at the end of the gradient.
    pub fn end(&self) -> Rgb8 {
        self.evaluate(1.0)
    }

    fn lerp_hue(&self, t: f32) -> f32 {
        let delta = (self.h1 - self.h0 + 540.0).rem_euclid(360.0) - 180.0;
        (self.h0 + delta * t).rem_euclid(360.0)
    }
}

impl Default for LaserColor {
    fn default() -> Self {
        Self::solid(0.0, 0.0, 1.0)
    }
}

/// A mutable HSV color, e.g. for hue cycling between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColorHsv {
    h: f32,
    s: f32,
    v: f32,
}

impl ColorHsv {
    pub fn new(h: f32, s: f32, v: f32) -> Self {
        Self {
            h: h.rem_euclid(360.0),
            s,
            v,
        }
    }

    pub fn hue(&self) -> f32 {
        self.h
    }

    pub fn saturation(&self) -> f32 {
        self.s
    }

    pub fn value(&self) -> f32 {
        self.v
    }

    /// Rotates the hue, wrapping into 0–360.
    pub fn add_hue(&mut self, delta: f32) {
        self.h = (self.h + delta).rem_euclid(360.0);
    }

    pub fn to_rgb(&self) -> Rgb8 {
        hsv_to_rgb(self.h, self.s, self.v)
    }

    /// A solid [`LaserColor`] with this color.
    pub fn to_laser_color(&self) -> LaserColor {
        LaserColor::solid(self.h, self.s, self.v)
    }
}

/// Converts HSV (hue in degrees, saturation/value in 0–1) to 8-bit RGB.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb8 {
    if s <= 0.0 {
        let gray = to_u8(v);
        return Rgb8::new(gray, gray, gray);
    }

    let hh = h.rem_euclid(360.0) / 60.0;
    let sector = hh.floor();
    let f = hh - sector;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb8::new(to_u8(r), to_u8(g), to_u8(b))
}

/// Converts 8-bit RGB to HSV (hue in degrees, saturation/value in 0–1).
///
/// Grays report hue 0.
pub fn rgb_to_hsv(color: Rgb8) -> (f32, f32, f32) {
    let r = color.r as f32 / 255.0;
    let g = color.g as f32 / 255.0;
    let b = color.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= 0.0 {
        return (0.0, s, v);
    }

    let h = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (h.rem_euclid(360.0), s, v)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn to_u8(c: f32) -> u8 {
    (c * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}
