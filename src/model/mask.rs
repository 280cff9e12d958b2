//! Transient binary mask used during line detection.

/// A single-channel boolean mask matching a source image pixel for pixel.
///
/// Produced by thresholding and reshaped by the morphology stages; masks
/// are working state inside the filter and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    /// Create an all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// Mask width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Value at `(x, y)`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.offset(x, y)]
    }

    /// Set the value at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let i = self.offset(x, y);
        self.data[i] = value;
    }

    /// Number of set pixels.
    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Whether no pixel is set.
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Flip every pixel in place.
    pub fn invert(&mut self) {
        for v in &mut self.data {
            *v = !*v;
        }
    }

    /// Raw row-major buffer.
    pub fn data(&self) -> &[bool] {
        &self.data
    }
}
