//! Persistence-of-vision rendering of a simulated beam trajectory.
//!
//! The renderer keeps a linear RGB energy buffer. Every consecutive pair of
//! [`SimPoint`]s is one simulation step of beam travel; the segment between
//! them deposits one unit of energy (scaled by color) as Gaussian splats
//! spread along its length. Slow or dwelling beam therefore looks bright,
//! fast travel looks dim, just like on a real projection surface.
//!
//! [`PersistenceRenderer::tonemap`] rolls the energy off with
//! `1 - exp(-energy * exposure)` followed by gamma encoding.

use image::{Rgba, RgbaImage};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{SimFrame, SimPoint};

/// Renderer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RendererConfig {
    /// Gaussian beam sigma in pixels.
    pub beam_radius: f32,
    /// Energy multiplier applied before tone mapping.
    pub exposure: f32,
    /// Display gamma.
    pub gamma: f32,
    /// Upper bound on splats per segment.
    pub max_substeps: usize,
    /// Map +y to the top row when false (screen convention), bottom row when true.
    pub invert_y: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            beam_radius: 0.8,
            exposure: 1.0,
            gamma: 2.2,
            max_substeps: 8,
            invert_y: false,
        }
    }
}

impl RendererConfig {
    /// Set the beam sigma in pixels (builder pattern).
    pub fn with_beam_radius(mut self, beam_radius: f32) -> Self {
        self.beam_radius = beam_radius;
        self
    }

    /// Set the exposure (builder pattern).
    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    /// Set the display gamma (builder pattern).
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the splat cap per segment (builder pattern).
    pub fn with_max_substeps(mut self, max_substeps: usize) -> Self {
        self.max_substeps = max_substeps;
        self
    }

    /// Flip the vertical mapping (builder pattern).
    pub fn with_invert_y(mut self, invert_y: bool) -> Self {
        self.invert_y = invert_y;
        self
    }
}

/// Receives tone-mapped images, e.g. a window blit or an image file writer.
pub trait DisplaySurface {
    fn blit(&mut self, image: &RgbaImage) -> Result<()>;
}

impl DisplaySurface for RgbaImage {
    fn blit(&mut self, image: &RgbaImage) -> Result<()> {
        self.clone_from(image);
        Ok(())
    }
}

/// Accumulates beam energy and converts it to an image.
#[derive(Debug, Clone)]
pub struct PersistenceRenderer {
    config: RendererConfig,
    /// RGB energy, row-major, `(y * width + x) * 3 + channel`.
    data: Vec<f32>,
    /// Per-splat horizontal kernel weights.
    kernel_x: Vec<f32>,
    width: usize,
    height: usize,
}

impl PersistenceRenderer {
    /// Creates a renderer with a black `width` x `height` buffer.
    pub fn new(width: usize, height: usize, config: RendererConfig) -> Result<Self> {
        let mut renderer = Self {
            config,
            data: Vec::new(),
            kernel_x: Vec::new(),
            width: 0,
            height: 0,
        };
        renderer.resize(width, height)?;
        Ok(renderer)
    }

    /// Reallocates the buffer for a new surface size and clears it.
    ///
    /// On failure the previous buffer and size are kept.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_config(format!(
                "buffer dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(Error::invalid_config(format!(
                "buffer dimensions {}x{} exceed the image size limit",
                width, height
            )));
        }
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| Error::resize(width, height, "size overflows usize"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| Error::resize(width, height, e.to_string()))?;
        data.resize(len, 0.0);

        log::debug!(
            "energy buffer resized {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        self.data = data;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RendererConfig) {
        self.config = config;
    }

    /// Clear the buffer to black.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Multiplies all energy by `factor`, for fading trails instead of clearing.
    pub fn decay(&mut self, factor: f32) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Sum of all energy over all pixels and channels.
    pub fn total_energy(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// RGB energy at a pixel, or `None` outside the buffer.
    pub fn energy_at(&self, x: usize, y: usize) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Deposits the beam path of `frame`.
    ///
    /// Segments where both endpoints are blanked deposit nothing.
    pub fn accumulate(&mut self, frame: &SimFrame) {
        let mut segments = 0usize;
        for pair in frame.points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if !a.is_on() && !b.is_on() {
                continue;
            }
            self.deposit_segment(a, b);
            segments += 1;
        }
        log::trace!(
            "accumulated {} lit segments from {} points",
            segments,
            frame.len()
        );
    }

    /// Converts a normalized beam position to continuous pixel coordinates.
    ///
    /// The [-1, 1] square maps onto the largest centered square of the buffer.
    pub fn norm_to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        let side = self.width.min(self.height) as f32;
        let left = (self.width as f32 - side) * 0.5;
        let top = (self.height as f32 - side) * 0.5;

        let px = left + (x * 0.5 + 0.5) * side;
        let py = if self.config.invert_y {
            top + (y * 0.5 + 0.5) * side
        } else {
            top + (0.5 - y * 0.5) * side
        };
        (px, py)
    }

    /// Tone-maps the buffer into an opaque RGBA image.
    pub fn tonemap(&self) -> RgbaImage {
        let exposure = self.config.exposure;
        let inv_gamma = 1.0 / self.config.gamma;
        let map = |e: f32| -> u8 {
            let v = (1.0 - (-e * exposure).exp()).powf(inv_gamma);
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        };

        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let idx = (y as usize * self.width + x as usize) * 3;
            Rgba([
                map(self.data[idx]),
                map(self.data[idx + 1]),
                map(self.data[idx + 2]),
                255,
            ])
        })
    }

    /// Tone-maps the buffer and hands the image to `surface`.
    pub fn present<S: DisplaySurface + ?Sized>(&self, surface: &mut S) -> Result<()> {
        surface.blit(&self.tonemap())
    }

    fn deposit_segment(&mut self, a: &SimPoint, b: &SimPoint) {
        let (x0, y0) = self.norm_to_pixel(a.x, a.y);
        let (x1, y1) = self.norm_to_pixel(b.x, b.y);
        let c0 = beam_color(a);
        let c1 = beam_color(b);

        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let max_substeps = self.config.max_substeps.max(1);
        let steps = if len.is_finite() {
            (len.ceil() as usize).clamp(1, max_substeps)
        } else {
            1
        };
        let dwell = 1.0 / steps as f32;

        for i in 0..steps {
            let t = (i as f32 + 0.5) / steps as f32;
            let color = [
                lerp(c0[0], c1[0], t),
                lerp(c0[1], c1[1], t),
                lerp(c0[2], c1[2], t),
            ];
            self.deposit_splat(lerp(x0, x1, t), lerp(y0, y1, t), color, dwell);
        }
    }

    /// Deposits one Gaussian splat whose weights sum to `dwell`.
    ///
    /// The kernel is normalized over its full footprint, so energy falling
    /// outside the buffer is lost rather than piled onto the edge.
    fn deposit_splat(&mut self, x: f32, y: f32, color: [f32; 3], dwell: f32) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }

        let sigma = self.config.beam_radius;
        if !sigma.is_finite() || sigma <= 0.0 {
            let (px, py) = (x.floor(), y.floor());
            if px >= 0.0 && py >= 0.0 {
                self.add(px as usize, py as usize, color, dwell);
            }
            return;
        }

        let radius = ((3.0 * sigma).ceil() as i64).min(self.width.max(self.height) as i64);
        let cx = x.floor() as i64;
        let cy = y.floor() as i64;
        let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);
        let gauss = |d: f32| (-d * d * inv_two_sigma_sq).exp();

        self.kernel_x.clear();
        self.kernel_x
            .extend((-radius..=radius).map(|d| gauss((cx + d) as f32 + 0.5 - x)));
        let sum_x: f32 = self.kernel_x.iter().sum();
        let sum_y: f32 = (-radius..=radius)
            .map(|d| gauss((cy + d) as f32 + 0.5 - y))
            .sum();
        let norm = sum_x * sum_y;
        if norm.is_nan() || norm <= 0.0 {
            return;
        }
        let scale = dwell / norm;

        for dy in -radius..=radius {
            let py = cy + dy;
            if py < 0 || py >= self.height as i64 {
                continue;
            }
            let wy = gauss(py as f32 + 0.5 - y) * scale;
            for (k, dx) in (-radius..=radius).enumerate() {
                let px = cx + dx;
                if px < 0 || px >= self.width as i64 {
                    continue;
                }
                let w = self.kernel_x[k] * wy;
                let idx = (py as usize * self.width + px as usize) * 3;
                self.data[idx] += color[0] * w;
                self.data[idx + 1] += color[1] * w;
                self.data[idx + 2] += color[2] * w;
            }
        }
    }

    fn add(&mut self, x: usize, y: usize, color: [f32; 3], weight: f32) {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 3;
            self.data[idx] += color[0] * weight;
            self.data[idx + 1] += color[1] * weight;
            self.data[idx + 2] += color[2] * weight;
        }
    }
}

/// Renders one trajectory onto a fresh buffer and tone-maps it.
pub fn render_frame(
    frame: &SimFrame,
    config: &RendererConfig,
    width: usize,
    height: usize,
) -> Result<RgbaImage> {
    let mut renderer = PersistenceRenderer::new(width, height, *config)?;
    renderer.accumulate(frame);
    Ok(renderer.tonemap())
}

/// Linear beam color of a point; blanked points are black.
fn beam_color(p: &SimPoint) -> [f32; 3] {
    if p.is_on() {
        [p.r as f32 / 255.0, p.g as f32 / 255.0, p.b as f32 / 255.0]
    } else {
        [0.0; 3]
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointFlags;

    fn lit(x: f32, y: f32) -> SimPoint {
        SimPoint {
            x,
            y,
            r: 255,
            g: 255,
            b: 255,
            flags: PointFlags::ON,
        }
    }

    fn off(x: f32, y: f32) -> SimPoint {
        SimPoint {
            x,
            y,
            ..Default::default()
        }
    }

    fn renderer(config: RendererConfig) -> PersistenceRenderer {
        match PersistenceRenderer::new(128, 128, config) {
            Ok(r) => r,
            Err(e) => panic!("renderer: {}", e),
        }
    }

    #[test]
    fn test_blanked_segment_deposits_nothing() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![off(-0.5, 0.0), off(0.5, 0.0)]));
        assert_eq!(r.total_energy(), 0.0);
    }

    #[test]
    fn test_clear_then_present_is_black() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![lit(-0.5, 0.0), lit(0.5, 0.0)]));
        assert!(r.total_energy() > 0.0);

        r.clear();
        let mut surface = RgbaImage::new(1, 1);
        assert!(r.present(&mut surface).is_ok());
        assert_eq!(surface.dimensions(), (128, 128));
        assert!(surface.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn test_energy_is_independent_of_substeps() {
        let frame = SimFrame::new(vec![lit(-0.4, 0.1), lit(0.3, -0.2), lit(0.3, 0.4)]);
        let totals: Vec<f64> = [1, 4, 64, 1000]
            .iter()
            .map(|&n| {
                let mut r = renderer(RendererConfig::default().with_max_substeps(n));
                r.accumulate(&frame);
                r.total_energy()
            })
            .collect();

        // two white segments, one unit per channel each
        for total in &totals {
            assert!((total - 6.0).abs() < 1e-3, "totals {:?}", totals);
        }
    }

    #[test]
    fn test_half_lit_segment_fades_to_black() {
        let mut r = renderer(RendererConfig::default().with_max_substeps(64));
        r.accumulate(&SimFrame::new(vec![lit(-0.5, 0.0), off(0.5, 0.0)]));
        // average of a white-to-black ramp
        assert!((r.total_energy() - 1.5).abs() < 1e-3);

        let (lx, ly) = r.norm_to_pixel(-0.45, 0.0);
        let (rx, ry) = r.norm_to_pixel(0.45, 0.0);
        let left = r.energy_at(lx as usize, ly as usize).unwrap_or_default()[0];
        let right = r.energy_at(rx as usize, ry as usize).unwrap_or_default()[0];
        assert!(left > right, "brightness should follow the lit end");
    }

    #[test]
    fn test_zero_length_lit_segment_deposits_one_splat() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![lit(0.0, 0.0), lit(0.0, 0.0)]));
        assert!((r.total_energy() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_single_point_frame_is_ignored() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![lit(0.0, 0.0)]));
        r.accumulate(&SimFrame::default());
        assert_eq!(r.total_energy(), 0.0);
    }

    #[test]
    fn test_norm_to_pixel_preserves_aspect() {
        let r = match PersistenceRenderer::new(200, 100, RendererConfig::default()) {
            Ok(r) => r,
            Err(e) => panic!("renderer: {}", e),
        };
        assert_eq!(r.norm_to_pixel(0.0, 0.0), (100.0, 50.0));
        assert_eq!(r.norm_to_pixel(-1.0, 1.0), (50.0, 0.0));
        assert_eq!(r.norm_to_pixel(1.0, -1.0), (150.0, 100.0));
    }

    #[test]
    fn test_invert_y_flips_vertical_mapping() {
        let r = renderer(RendererConfig::default().with_invert_y(true));
        assert_eq!(r.norm_to_pixel(0.0, 1.0), (64.0, 128.0));
    }

    #[test]
    fn test_decay_scales_energy() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![lit(-0.5, 0.0), lit(0.5, 0.0)]));
        let before = r.total_energy();
        r.decay(0.5);
        assert!((r.total_energy() - before * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_tonemap_saturates_without_clipping_artifacts() {
        let mut r = renderer(RendererConfig::default().with_exposure(100.0));
        let frame = SimFrame::new(vec![lit(0.0, 0.0); 50]);
        r.accumulate(&frame);
        let image = r.tonemap();
        let (cx, cy) = r.norm_to_pixel(0.0, 0.0);
        let center = image.get_pixel(cx as u32, cy as u32);
        assert_eq!(*center, Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let err = PersistenceRenderer::new(0, 10, RendererConfig::default()).unwrap_err();
        assert!(!err.is_resize());
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_failed_resize_keeps_previous_buffer() {
        let mut r = renderer(RendererConfig::default());
        r.accumulate(&SimFrame::new(vec![lit(-0.5, 0.0), lit(0.5, 0.0)]));
        let before = r.total_energy();

        let err = r.resize(1 << 31, 1 << 31).unwrap_err();
        assert!(err.is_resize(), "got {}", err);
        assert_eq!((r.width(), r.height()), (128, 128));
        assert_eq!(r.total_energy(), before);
    }

    #[test]
    fn test_render_frame_matches_renderer() {
        let frame = SimFrame::new(vec![lit(-0.5, -0.5), lit(0.5, 0.5)]);
        let config = RendererConfig::default();
        let image = match render_frame(&frame, &config, 64, 64) {
            Ok(image) => image,
            Err(e) => panic!("render: {}", e),
        };
        let mut r = match PersistenceRenderer::new(64, 64, config) {
            Ok(r) => r,
            Err(e) => panic!("renderer: {}", e),
        };
        r.accumulate(&frame);
        assert_eq!(image, r.tonemap());
    }
}
