//! Whole-page rasterization fallback.
//!
//! When embedded-image extraction fails, the document is rendered page by
//! page through PDFium instead. Every page becomes exactly one image,
//! whether or not it contains embedded rasters, so the fallback always
//! covers the full document.

use std::path::Path;

use pdfium_render::prelude::*;

use crate::error::{Error, Result};
use crate::model::{Page, RasterImage};
use crate::pipeline::CancelToken;
use crate::progress::{ProgressPhase, ProgressSink};

/// Points per inch in PDF coordinate space.
const POINTS_PER_INCH: f32 = 72.0;

/// Target rendering resolution.
pub const RENDER_DPI: u32 = 300;

/// Renders every page of a PDF to a fixed-resolution raster image.
pub struct PageRasterizer {
    pdfium: Pdfium,
    dpi: u32,
}

impl PageRasterizer {
    /// Bind to the PDFium library and create a rasterizer at 300 dpi.
    ///
    /// Looks for the library next to the executable, under
    /// `./vendor/pdfium/lib/`, and finally in the system paths.
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "./vendor/pdfium/lib/",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| {
                Error::Render(format!(
                    "PDFium library not found (install libpdfium or place it next to the binary): {}",
                    e
                ))
            })?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            dpi: RENDER_DPI,
        })
    }

    /// Render every page of `path` in page order.
    ///
    /// Emits one progress event per page (phase "flattening and
    /// processing"). Any failure is fatal; there is no data-dependent
    /// partial success here. `cancel` is checked before each page render.
    pub fn rasterize<P: AsRef<Path>>(
        &self,
        path: P,
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Vec<Page>> {
        let document = self
            .pdfium
            .load_pdf_from_file(path.as_ref(), None)
            .map_err(|e| Error::Render(format!("loading document: {}", e)))?;

        let total = document.pages().len() as usize;
        let scale = render_scale(self.dpi);
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut pages = Vec::with_capacity(total);
        for (index, page) in document.pages().iter().enumerate() {
            cancel.check()?;
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| Error::Render(format!("page {}: {}", index + 1, e)))?;
            let rgb = bitmap.as_image().to_rgb8();
            let image = RasterImage::from_rgb_image(rgb)?.with_dpi(self.dpi);
            pages.push(Page::new(index, image, self.dpi));
            progress.report(index + 1, total, ProgressPhase::Flattening);
        }

        Ok(pages)
    }
}

/// Scale factor from the 72-dpi PDF point space to the target resolution.
pub fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}
