//! Page-level types.

use super::RasterImage;

/// One acquired page: its position in the document and its pixels.
///
/// Created by the extractor or the rasterizer, its image is replaced (same
/// index, new pixels) by the line-removal filter, and the assembler
/// consumes it when building the output document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based position in document order.
    pub index: usize,

    /// Pixel content of the page.
    pub image: RasterImage,

    /// Resolution tag in dots per inch.
    pub dpi: u32,
}

impl Page {
    /// Create a page from an acquired image.
    pub fn new(index: usize, image: RasterImage, dpi: u32) -> Self {
        Self { index, image, dpi }
    }

    /// Page dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Replace the image, keeping index and resolution.
    ///
    /// The replacement must have the same dimensions as the current image;
    /// pipeline stages never resize pages.
    pub fn replace_image(&mut self, image: RasterImage) {
        debug_assert_eq!(self.image.dimensions(), image.dimensions());
        self.image = image;
    }

    /// Take the image out of the page, consuming it.
    pub fn into_image(self) -> RasterImage {
        self.image
    }
}
