//! Restoration pipeline orchestrator.
//!
//! Sequences acquisition, line removal, and assembly for one input:
//!
//! ```text
//! PDF:   Acquire -> [extraction failed -> FallbackAcquire] -> Restore -> Assemble -> Done
//! image: Restore -> SaveDirect -> Done
//! ```
//!
//! The branch between extraction and the rasterization fallback is an
//! explicit `Result` check, not fault propagation; everything after
//! acquisition is shared between the two paths.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::assemble::PageAssembler;
use crate::detect::{detect_format_from_path, InputFormat};
use crate::error::{Error, Result};
use crate::extract::PageImageExtractor;
use crate::filter::{FilterParams, LineRemovalFilter};
use crate::model::{Page, RasterImage};
use crate::progress::{ProgressPhase, ProgressSink};
use crate::raster::PageRasterizer;

/// Cooperative cancellation flag, checked between pages.
///
/// Cloneable and thread-safe; hand one copy to the pipeline and keep the
/// other wherever the cancel decision is made.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next between-page check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fail with [`Error::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Options controlling a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Filter parameters for the restore stage.
    pub filter: FilterParams,

    /// Restore pages across the thread pool instead of one at a time.
    /// Output order is preserved either way.
    pub parallel: bool,

    /// Cancellation token checked between pages.
    pub cancel: CancelToken,
}

impl PipelineOptions {
    /// Create options with defaults (sequential, default filter).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter parameters.
    pub fn with_filter(mut self, filter: FilterParams) -> Self {
        self.filter = filter;
        self
    }

    /// Enable or disable parallel page restoration.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Orchestrates one restoration run from input path to output artifact.
pub struct Pipeline {
    options: PipelineOptions,
    filter: LineRemovalFilter,
}

impl Pipeline {
    /// Create a pipeline with default options.
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    /// Create a pipeline with custom options.
    pub fn with_options(options: PipelineOptions) -> Self {
        let filter = LineRemovalFilter::with_params(options.filter.clone());
        Self { options, filter }
    }

    /// Run the pipeline for `input`, writing the result to `output` (or a
    /// derived path when `None`). Returns the path actually written.
    ///
    /// Progress events flow through `progress`; the final event is always
    /// `Done` with `completed == total`. On any failure no output artifact
    /// is left behind.
    pub fn run<P: AsRef<Path>>(
        &self,
        input: P,
        output: Option<&Path>,
        progress: &ProgressSink,
    ) -> Result<PathBuf> {
        let input = input.as_ref();
        let format = detect_format_from_path(input)?;
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => derive_output_path(input),
        };

        match format {
            InputFormat::Pdf => self.run_document(input, &output, progress),
            InputFormat::Png | InputFormat::Jpeg => {
                self.run_single_image(input, &output, progress)
            }
        }
    }

    /// Document path: acquire, restore, assemble.
    fn run_document(&self, input: &Path, output: &Path, progress: &ProgressSink) -> Result<PathBuf> {
        let mut pages = self.acquire(input, progress)?;
        self.restore(&mut pages, progress)?;
        self.options.cancel.check()?;

        let assembler = PageAssembler::new();
        let written = assembler.assemble(&pages, output, progress, &self.options.cancel)?;

        progress.report(pages.len(), pages.len(), ProgressPhase::Done);
        log::info!("restored document written to {}", written.display());
        Ok(written)
    }

    /// Acquire page images: extraction first, whole-document rasterization
    /// when extraction fails anywhere.
    fn acquire(&self, input: &Path, progress: &ProgressSink) -> Result<Vec<Page>> {
        let extractor = PageImageExtractor::open(input)?;
        match extractor.extract(progress, &self.options.cancel) {
            Ok(pages) => Ok(pages),
            Err(Error::ExtractFailed(reason)) => {
                log::warn!(
                    "extraction failed ({}), falling back to page rasterization",
                    reason
                );
                self.options.cancel.check()?;
                let rasterizer = PageRasterizer::new()?;
                rasterizer.rasterize(input, progress, &self.options.cancel)
            }
            Err(other) => Err(other),
        }
    }

    /// Run the line-removal filter over every page, preserving order.
    fn restore(&self, pages: &mut [Page], progress: &ProgressSink) -> Result<()> {
        let total = pages.len();
        // The send happens under the counter lock so a lower count can
        // never be reported after a higher one.
        let completed = Mutex::new(0usize);

        let restore_one = |page: &mut Page| -> Result<()> {
            self.options.cancel.check()?;
            let restored = self.filter.apply(&page.image)?;
            page.replace_image(restored);
            let mut done = completed
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *done += 1;
            progress.report(*done, total, ProgressPhase::Restoring);
            Ok(())
        };

        if self.options.parallel {
            pages.par_iter_mut().try_for_each(restore_one)?;
        } else {
            pages.iter_mut().try_for_each(restore_one)?;
        }
        Ok(())
    }

    /// Single-image path: decode, restore, save directly.
    fn run_single_image(
        &self,
        input: &Path,
        output: &Path,
        progress: &ProgressSink,
    ) -> Result<PathBuf> {
        let decoded = image::open(input)?.to_rgb8();
        let image = RasterImage::from_rgb_image(decoded)?;

        self.options.cancel.check()?;
        let restored = self.filter.apply(&image)?;
        progress.report(1, 1, ProgressPhase::Restoring);

        save_image_atomic(&restored, output)?;
        progress.report(1, 1, ProgressPhase::Done);
        log::info!("restored image written to {}", output.display());
        Ok(output.to_path_buf())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive the output path from the input when none is given: the input
/// file name prefixed with `processed_`, in the same directory.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("processed_{}", name))
}

/// Save a raster image through a temporary sibling, renamed on success.
fn save_image_atomic(image: &RasterImage, output: &Path) -> Result<()> {
    let format = image::ImageFormat::from_path(output)
        .map_err(|_| Error::UnsupportedFormat(output.display().to_string()))?;

    let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    image
        .to_rgb_image()
        .save_with_format(tmp.path(), format)?;
    tmp.persist(output)
        .map_err(|e| Error::Io(e.error))?;
    Ok(())
}
