//! Input format detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Recognized input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Multi-page PDF document.
    Pdf,
    /// PNG raster image.
    Png,
    /// JPEG raster image.
    Jpeg,
}

impl InputFormat {
    /// Whether this input is a single raster image rather than a document.
    pub fn is_image(&self) -> bool {
        matches!(self, InputFormat::Png | InputFormat::Jpeg)
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Pdf => write!(f, "PDF"),
            InputFormat::Png => write!(f, "PNG"),
            InputFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// PNG magic bytes.
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// JPEG SOI marker.
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Detect the input format from a file path.
///
/// The extension decides which format is expected; the file header is then
/// checked against that format's magic bytes so a mislabeled file is
/// rejected instead of being handed to the wrong decoder.
///
/// # Returns
/// * `Ok(InputFormat)` for a recognized, consistent input
/// * `Err(Error::UnsupportedFormat)` otherwise
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let path = path.as_ref();
    let expected = format_from_extension(path)?;

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 16];
    let read = reader.read(&mut header)?;

    let detected = detect_format_from_bytes(&header[..read])?;
    if detected != expected {
        return Err(Error::UnsupportedFormat(format!(
            "{} content behind a .{} extension",
            detected,
            extension_of(path)
        )));
    }
    Ok(detected)
}

/// Detect the input format from leading bytes.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<InputFormat> {
    if data.starts_with(PDF_MAGIC) {
        return Ok(InputFormat::Pdf);
    }
    if data.starts_with(PNG_MAGIC) {
        return Ok(InputFormat::Png);
    }
    if data.starts_with(JPEG_MAGIC) {
        return Ok(InputFormat::Jpeg);
    }
    Err(Error::UnsupportedFormat("unrecognized file header".into()))
}

/// Classify a path by extension alone (no file access).
pub fn format_from_extension<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let ext = extension_of(path.as_ref());
    match ext.as_str() {
        "pdf" => Ok(InputFormat::Pdf),
        "png" => Ok(InputFormat::Png),
        "jpg" | "jpeg" => Ok(InputFormat::Jpeg),
        _ => Err(Error::UnsupportedFormat(if ext.is_empty() {
            "no file extension".to_string()
        } else {
            ext
        })),
    }
}

/// Check if a path has a supported extension.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    format_from_extension(path).is_ok()
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
