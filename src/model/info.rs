//! Document summary for the `info` surface.

use serde::{Deserialize, Serialize};

/// Summary of a PDF input, as reported by the CLI `info` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// PDF version string (e.g., "1.7").
    pub version: String,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Number of embedded image XObjects across all pages.
    pub embedded_images: usize,

    /// Whether the document is encrypted.
    pub encrypted: bool,
}

impl DocumentInfo {
    /// Whether the extraction path can be attempted at all.
    ///
    /// Zero embedded images means the pipeline will go straight to the
    /// rasterization fallback.
    pub fn has_embedded_images(&self) -> bool {
        self.embedded_images > 0
    }
}
