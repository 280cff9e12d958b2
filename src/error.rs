//! Error types for the unrule library.

use std::io;
use thiserror::Error;

/// Result type alias for unrule operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while restoring a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file type is not one of the recognized formats.
    #[error("Unsupported input format: {0} (expected PDF, PNG or JPEG)")]
    UnsupportedFormat(String),

    /// Embedded-image extraction failed somewhere in the document.
    ///
    /// Recovered internally: the pipeline falls back to whole-document
    /// rasterization, so this error only reaches the caller if the
    /// fallback itself fails.
    #[error("Embedded image extraction failed: {0}")]
    ExtractFailed(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// An image buffer violates its dimension invariants.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Error decoding raster image data.
    #[error("Image decoding error: {0}")]
    ImageDecode(String),

    /// Fallback page rasterization failed.
    #[error("Page rasterization error: {0}")]
    Render(String),

    /// Output document assembly failed.
    #[error("Document assembly error: {0}")]
    Assembly(String),

    /// The operation was cancelled before completion.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::ImageDecode(err.to_string()),
        }
    }
}
