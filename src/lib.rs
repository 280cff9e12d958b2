//! # unrule
//!
//! Removes printed ruled lines from scanned documents and rebuilds clean
//! pages.
//!
//! Given a scanned PDF (or a single page image), unrule detects the
//! horizontal ruling of lined forms, erases it, reconstructs the content
//! underneath by inpainting, and reassembles the cleaned pages into an A4
//! output PDF at 300 dpi.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unrule::restore_file;
//!
//! fn main() -> unrule::Result<()> {
//!     // Writes processed_scan.pdf next to the input
//!     let output = restore_file("scan.pdf", None)?;
//!     println!("written: {}", output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## How it works
//!
//! - **Acquisition**: embedded page images are extracted from the PDF in
//!   page order; if extraction fails anywhere the whole document is
//!   rasterized at 300 dpi through PDFium instead.
//! - **Restoration**: each page runs through [`LineRemovalFilter`]:
//!   adaptive thresholding, morphological opening with a wide flat
//!   element, and fluid-propagation inpainting.
//! - **Assembly**: cleaned pages are packed one-per-page into an A4 PDF,
//!   written atomically.
//!
//! Progress flows through a channel ([`ProgressSink`]), so a UI or
//! progress bar can consume events from its own thread.

pub mod assemble;
pub mod detect;
pub mod error;
pub mod extract;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod raster;

// Re-export commonly used types
pub use assemble::{fit_to_a4, PageAssembler, A4_HEIGHT_PT, A4_WIDTH_PT};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_supported, InputFormat};
pub use error::{Error, Result};
pub use extract::PageImageExtractor;
pub use filter::{FilterParams, LineRemovalFilter};
pub use model::{BinaryMask, DocumentInfo, Page, RasterImage};
pub use pipeline::{derive_output_path, CancelToken, Pipeline, PipelineOptions};
pub use progress::{ProgressEvent, ProgressPhase, ProgressSink};
pub use raster::{PageRasterizer, RENDER_DPI};

use std::path::{Path, PathBuf};

/// Restore a document or image file, writing the cleaned result.
///
/// # Arguments
///
/// * `input` - Path to a PDF, PNG or JPEG file
/// * `output` - Destination path; when `None`, the input file name is
///   prefixed with `processed_` in the same directory
///
/// # Returns
///
/// The path of the written artifact.
///
/// # Example
///
/// ```no_run
/// use unrule::restore_file;
///
/// let output = restore_file("scan.pdf", None).unwrap();
/// ```
pub fn restore_file<P: AsRef<Path>>(input: P, output: Option<&Path>) -> Result<PathBuf> {
    Pipeline::new().run(input, output, &ProgressSink::sink_only())
}

/// Restore a file with custom options and a progress sink.
///
/// # Example
///
/// ```no_run
/// use unrule::{restore_file_with_options, PipelineOptions, ProgressSink};
///
/// let (sink, events) = ProgressSink::channel();
/// std::thread::spawn(move || {
///     for event in events {
///         eprintln!("{}/{} {}", event.completed, event.total, event.phase);
///     }
/// });
///
/// let options = PipelineOptions::new().with_parallel(true);
/// restore_file_with_options("scan.pdf", None, options, &sink).unwrap();
/// ```
pub fn restore_file_with_options<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    options: PipelineOptions,
    progress: &ProgressSink,
) -> Result<PathBuf> {
    Pipeline::with_options(options).run(input, output, progress)
}

/// Run the line-removal filter over one in-memory image.
///
/// # Example
///
/// ```no_run
/// use unrule::{restore_image, RasterImage};
///
/// let image = RasterImage::from_rgb_image(image::open("page.png").unwrap().to_rgb8()).unwrap();
/// let cleaned = restore_image(&image).unwrap();
/// ```
pub fn restore_image(image: &RasterImage) -> Result<RasterImage> {
    LineRemovalFilter::new().apply(image)
}

/// Summarize a PDF input without processing it.
///
/// # Example
///
/// ```no_run
/// use unrule::document_info;
///
/// let info = document_info("scan.pdf").unwrap();
/// println!("{} pages, {} embedded images", info.page_count, info.embedded_images);
/// ```
pub fn document_info<P: AsRef<Path>>(path: P) -> Result<DocumentInfo> {
    Ok(PageImageExtractor::open(path)?.info())
}

/// Builder for configuring and running a restoration.
///
/// # Example
///
/// ```no_run
/// use unrule::Unrule;
///
/// let output = Unrule::new()
///     .parallel()
///     .line_element_width(60)
///     .restore("scan.pdf")?;
/// # Ok::<(), unrule::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Unrule {
    options: PipelineOptions,
    output: Option<PathBuf>,
}

impl Unrule {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore pages across the thread pool.
    pub fn parallel(mut self) -> Self {
        self.options = self.options.with_parallel(true);
        self
    }

    /// Set the output path explicitly.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Set the structuring-element width used to isolate ruled lines.
    pub fn line_element_width(mut self, width: u32) -> Self {
        self.options.filter.line_element_width = width;
        self
    }

    /// Set the inpainting search radius.
    pub fn inpaint_radius(mut self, radius: u32) -> Self {
        self.options.filter.inpaint_radius = radius;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.options = self.options.with_cancel_token(token);
        self
    }

    /// Run the restoration, discarding progress events.
    pub fn restore<P: AsRef<Path>>(self, input: P) -> Result<PathBuf> {
        self.restore_with_progress(input, &ProgressSink::sink_only())
    }

    /// Run the restoration, reporting progress to `sink`.
    pub fn restore_with_progress<P: AsRef<Path>>(
        self,
        input: P,
        sink: &ProgressSink,
    ) -> Result<PathBuf> {
        Pipeline::with_options(self.options).run(input, self.output.as_deref(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_settings() {
        let builder = Unrule::new()
            .parallel()
            .line_element_width(50)
            .inpaint_radius(7)
            .output("out.pdf");
        assert!(builder.options.parallel);
        assert_eq!(builder.options.filter.line_element_width, 50);
        assert_eq!(builder.options.filter.inpaint_radius, 7);
        assert_eq!(builder.output, Some(PathBuf::from("out.pdf")));
    }

    #[test]
    fn test_restore_image_passthrough() {
        let image = RasterImage::filled(60, 40, [255, 255, 255]).unwrap();
        let restored = restore_image(&image).unwrap();
        assert_eq!(restored, image);
    }
}
