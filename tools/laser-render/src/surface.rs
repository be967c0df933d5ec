//! PNG file display surface.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use laser_emu::{DisplaySurface, Error, Result};

/// Writes every presented image to a file, overwriting the previous one.
pub struct PngSurface {
    path: PathBuf,
}

impl PngSurface {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DisplaySurface for PngSurface {
    fn blit(&mut self, image: &RgbaImage) -> Result<()> {
        image.save(&self.path).map_err(Error::surface)
    }
}
