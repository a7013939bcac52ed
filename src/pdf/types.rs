//! Core types for page virtualization and rendering

use serde::{Deserialize, Serialize};

/// Intrinsic or scaled size of a page, in CSS pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size of the page when drawn at `scale`
    #[must_use]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Available display area of the viewer stage
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for ContainerSize {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// How the raster scale of a page is chosen
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ViewMode {
    /// Scale derived from the container size
    #[default]
    Fit,
    /// Explicit zoom factor
    Manual(f32),
}

impl ViewMode {
    #[must_use]
    pub fn is_fit(self) -> bool {
        matches!(self, Self::Fit)
    }
}

/// Owner of a global page: document index plus 1-based local page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageLocation {
    pub doc_index: usize,
    pub local_page: usize,
}

impl PageLocation {
    #[must_use]
    pub const fn new(doc_index: usize, local_page: usize) -> Self {
        Self {
            doc_index,
            local_page,
        }
    }
}

/// Pixel surface a page is rasterized into.
///
/// Holds packed RGB pixel data (3 bytes per pixel, no row padding). The
/// backing store may be larger than the CSS size when a device pixel ratio
/// above 1 is in effect.
#[derive(Clone)]
pub struct Surface {
    /// Raw RGB pixel data
    pub pixels: Vec<u8>,
    /// Backing store width in pixels
    pub width_px: u32,
    /// Backing store height in pixels
    pub height_px: u32,
    /// Scale the page was drawn at, excluding the device pixel ratio
    pub scale: f32,
    /// Device pixel ratio applied to the backing store
    pub pixel_ratio: f32,
}

impl Surface {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Allocate a white surface of the given backing size
    #[must_use]
    pub fn new(width_px: u32, height_px: u32, scale: f32, pixel_ratio: f32) -> Self {
        let len = width_px as usize * height_px as usize * Self::BYTES_PER_PIXEL;
        Self {
            pixels: vec![0xFF; len],
            width_px,
            height_px,
            scale,
            pixel_ratio,
        }
    }

    /// Row stride in bytes
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width_px as usize * Self::BYTES_PER_PIXEL
    }

    /// Write the surface to a PNG file
    pub fn write_png(&self, path: &std::path::Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), self.width_px, self.height_px);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().map_err(std::io::Error::other)?;
        writer
            .write_image_data(&self.pixels)
            .map_err(std::io::Error::other)?;
        Ok(())
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale", &self.scale)
            .field("pixel_ratio", &self.pixel_ratio)
            .finish_non_exhaustive()
    }
}
