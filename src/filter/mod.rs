//! Ruled-line removal filter.
//!
//! Takes one RGB page image and returns a copy with printed horizontal
//! rules removed and the pixels underneath reconstructed. The stages:
//!
//! 1. luminance conversion;
//! 2. inverted Gaussian adaptive threshold (dark-on-light foreground);
//! 3. morphological opening with a wide flat element to isolate runs long
//!    enough to be ruling rather than handwriting or type;
//! 4. a small square dilation so anti-aliased line edges are covered;
//! 5. masked pass-through zeroing the covered pixels;
//! 6. fluid-propagation inpainting of the zeroed region.
//!
//! With fixed parameters the filter is deterministic: identical input
//! produces identical output. Dimensions never change.

mod inpaint;
mod morphology;
mod threshold;

pub use inpaint::inpaint;
pub use morphology::{dilate, erode, open};
pub use threshold::{adaptive_threshold, gaussian_blur, luminance};

use crate::error::{Error, Result};
use crate::model::{BinaryMask, RasterImage};

/// Tunable parameters of the line-removal filter.
///
/// The defaults are the values the restoration pipeline was calibrated
/// with; change them only for experimentation, not for compatible output.
#[derive(Debug, Clone)]
pub struct FilterParams {
    /// Side of the adaptive-threshold neighborhood (odd).
    pub threshold_block: u32,

    /// Bias subtracted from the local mean before comparing.
    pub threshold_bias: f32,

    /// Width of the flat structuring element used to isolate rules.
    pub line_element_width: u32,

    /// Erode/dilate repetitions of the opening.
    pub open_iterations: u32,

    /// Side of the square dilation that pads the detected lines.
    pub pad_element: u32,

    /// Inpainting search radius in pixels.
    pub inpaint_radius: u32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            threshold_block: 21,
            threshold_bias: 10.0,
            line_element_width: 40,
            open_iterations: 2,
            pad_element: 3,
            inpaint_radius: 5,
        }
    }
}

impl FilterParams {
    /// Create parameters with the calibrated defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the structuring-element width used to isolate rules.
    pub fn with_line_element_width(mut self, width: u32) -> Self {
        self.line_element_width = width;
        self
    }

    /// Set the inpainting search radius.
    pub fn with_inpaint_radius(mut self, radius: u32) -> Self {
        self.inpaint_radius = radius;
        self
    }
}

/// Removes ruled lines from page images.
#[derive(Debug, Clone, Default)]
pub struct LineRemovalFilter {
    params: FilterParams,
}

impl LineRemovalFilter {
    /// Create a filter with the calibrated default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with custom parameters.
    pub fn with_params(params: FilterParams) -> Self {
        Self { params }
    }

    /// The active parameters.
    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    /// Detect the ruled-line mask for an image without modifying it.
    ///
    /// This is the mask of pixels that `apply` will reconstruct, already
    /// padded by the safety dilation.
    pub fn detect_lines(&self, image: &RasterImage) -> Result<BinaryMask> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage("zero-dimension input".into()));
        }

        let gray = luminance(image);
        let foreground = adaptive_threshold(
            &gray,
            width,
            height,
            self.params.threshold_block,
            self.params.threshold_bias,
        );
        let lines = open(
            &foreground,
            self.params.line_element_width,
            1,
            self.params.open_iterations,
        );
        Ok(dilate(&lines, self.params.pad_element, self.params.pad_element))
    }

    /// Remove ruled lines from `image`, returning the restored copy.
    ///
    /// The output has the same dimensions and resolution tag as the input;
    /// pixels away from any detected line are bit-identical to it. When no
    /// line qualifies, the input is returned unchanged.
    pub fn apply(&self, image: &RasterImage) -> Result<RasterImage> {
        let line_mask = self.detect_lines(image)?;
        if line_mask.is_empty() {
            log::debug!("no ruled lines detected, image passed through");
            return Ok(image.clone());
        }
        log::debug!(
            "reconstructing {} of {} pixels",
            line_mask.count_set(),
            image.width() as usize * image.height() as usize
        );

        // Masked pass-through: zero the covered pixels, then rebuild them
        // from their surroundings.
        let mut stripped = image.clone();
        for y in 0..image.height() {
            for x in 0..image.width() {
                if line_mask.get(x, y) {
                    stripped.set_pixel(x, y, [0, 0, 0]);
                }
            }
        }

        let restored = inpaint(&stripped, &line_mask, self.params.inpaint_radius);
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// White page with a solid dark horizontal rule.
    fn page_with_rule(w: u32, h: u32, rule_y: u32, rule_thickness: u32) -> RasterImage {
        let mut img = RasterImage::filled(w, h, [250, 250, 250]).unwrap();
        for y in rule_y..rule_y + rule_thickness {
            for x in 0..w {
                img.set_pixel(x, y, [30, 30, 30]);
            }
        }
        img
    }

    #[test]
    fn test_zero_dimension_rejected_upstream() {
        // RasterImage cannot be constructed with zero dims, so the filter
        // precondition is only reachable through detect_lines' own guard.
        let filter = LineRemovalFilter::new();
        let img = RasterImage::filled(50, 50, [255, 255, 255]).unwrap();
        assert!(filter.detect_lines(&img).is_ok());
    }

    #[test]
    fn test_rule_is_detected() {
        let img = page_with_rule(200, 60, 30, 2);
        let filter = LineRemovalFilter::new();
        let mask = filter.detect_lines(&img).unwrap();
        assert!(mask.get(100, 30));
        assert!(mask.get(100, 31));
        // Padding covers one extra row
        assert!(mask.get(100, 29));
        // Far away rows untouched
        assert!(!mask.get(100, 5));
    }

    #[test]
    fn test_rule_is_reconstructed() {
        let img = page_with_rule(200, 60, 30, 2);
        let filter = LineRemovalFilter::new();
        let out = filter.apply(&img).unwrap();

        assert_eq!(out.dimensions(), img.dimensions());
        // Pixels under the rule changed from near-black toward paper
        let px = out.pixel(100, 30);
        assert!(px[0] > 150, "rule should be inpainted, got {:?}", px);
        // Pixels well away from the rule are bit-identical
        for y in 0..8 {
            for x in 0..200 {
                assert_eq!(out.pixel(x, y), img.pixel(x, y));
            }
        }
    }

    #[test]
    fn test_no_lines_is_identity() {
        let img = RasterImage::filled(120, 80, [240, 240, 240]).unwrap();
        let filter = LineRemovalFilter::new();
        let out = filter.apply(&img).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_short_marks_survive() {
        // A 12px dash is narrower than the 40px element and must remain
        let mut img = RasterImage::filled(200, 60, [250, 250, 250]).unwrap();
        for x in 90..102 {
            img.set_pixel(x, 30, [20, 20, 20]);
        }
        let filter = LineRemovalFilter::new();
        let out = filter.apply(&img).unwrap();
        assert_eq!(out.pixel(95, 30), [20, 20, 20]);
    }

    #[test]
    fn test_double_application_does_not_crash() {
        let img = page_with_rule(150, 50, 25, 3);
        let filter = LineRemovalFilter::new();
        let once = filter.apply(&img).unwrap();
        let twice = filter.apply(&once).unwrap();
        assert_eq!(twice.dimensions(), img.dimensions());
    }

    #[test]
    fn test_deterministic() {
        let img = page_with_rule(150, 50, 25, 2);
        let filter = LineRemovalFilter::new();
        assert_eq!(filter.apply(&img).unwrap(), filter.apply(&img).unwrap());
    }

    #[test]
    fn test_params_builder() {
        let params = FilterParams::new()
            .with_line_element_width(60)
            .with_inpaint_radius(3);
        let filter = LineRemovalFilter::with_params(params);
        assert_eq!(filter.params().line_element_width, 60);
        assert_eq!(filter.params().inpaint_radius, 3);
    }
}
