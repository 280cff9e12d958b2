//! In-memory pixel buffer for pipeline stages.

use crate::error::{Error, Result};
use image::RgbImage;

/// Number of color channels carried through the pipeline.
pub(crate) const CHANNELS: usize = 3;

/// An RGB image with 8 bits per channel and optional resolution metadata.
///
/// Invariants: `width` and `height` are nonzero and
/// `data.len() == width * height * 3`. Both are enforced at construction
/// and hold for the life of the value, so downstream stages can index the
/// buffer without re-checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    /// Resolution metadata in dots per inch, when known.
    pub dpi: Option<u32>,
}

impl RasterImage {
    /// Create an image from a raw RGB buffer.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!(
                "zero dimension: {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "buffer length {} does not match {}x{}x3 = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            dpi: None,
        })
    }

    /// Create a solid-color image (mostly useful in tests and benches).
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let px = width as usize * height as usize;
        let mut data = Vec::with_capacity(px * CHANNELS);
        for _ in 0..px {
            data.extend_from_slice(&rgb);
        }
        Self::from_rgb(width, height, data)
    }

    /// Wrap an `image` crate RGB buffer.
    pub fn from_rgb_image(img: RgbImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        Self::from_rgb(width, height, img.into_raw())
    }

    /// Set the resolution tag.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image dimensions as a `(width, height)` tuple.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGB pixel buffer, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The RGB triple at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Overwrite the RGB triple at `(x, y)`.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&rgb);
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Convert into an `image` crate RGB buffer, consuming self.
    pub fn into_rgb_image(self) -> RgbImage {
        // Construction enforces data.len() == width * height * 3.
        RgbImage::from_raw(self.width, self.height, self.data)
            .expect("buffer length matches dimensions")
    }

    /// Borrow as an `image` crate RGB buffer (copies the pixel data).
    pub fn to_rgb_image(&self) -> RgbImage {
        self.clone().into_rgb_image()
    }
}
