//! Embedded-image extraction from PDF documents.

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use lopdf::Document as LopdfDocument;

use crate::error::{Error, Result};
use crate::model::{DocumentInfo, Page, RasterImage};
use crate::pipeline::CancelToken;
use crate::progress::{ProgressPhase, ProgressSink};

/// Default resolution tag for extracted images whose true scan resolution
/// is unknown. Scanned forms are overwhelmingly 300 dpi material.
const DEFAULT_DPI: u32 = 300;

/// Walks a PDF's page tree and pulls out embedded raster images in page
/// order.
///
/// Extraction is all-or-nothing: a decode or structural failure anywhere
/// in the document aborts the whole run with [`Error::ExtractFailed`] and
/// discards any images already extracted, so the caller can fall back to
/// rasterizing the complete document instead of emitting a partial one.
pub struct PageImageExtractor {
    doc: LopdfDocument,
}

impl PageImageExtractor {
    /// Open a PDF file for extraction.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path.as_ref()).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Summarize the document without decoding any image data.
    pub fn info(&self) -> DocumentInfo {
        let mut embedded = 0;
        for (_, page_id) in self.doc.get_pages() {
            embedded += self.image_xobjects(page_id).map(|v| v.len()).unwrap_or(0);
        }
        DocumentInfo {
            version: self.doc.version.to_string(),
            page_count: self.page_count(),
            embedded_images: embedded,
            encrypted: self.doc.is_encrypted(),
        }
    }

    /// Extract every embedded raster image, in page traversal order.
    ///
    /// Within a page, images come out in the storage order of the page's
    /// XObject dictionary. That order is inherited from the producing
    /// application and is not a cross-run contract.
    ///
    /// Emits one progress event per decoded image (phase "extracting
    /// images"); the total is fixed by a counting pass up front. `cancel`
    /// is checked before each decode.
    pub fn extract(&self, progress: &ProgressSink, cancel: &CancelToken) -> Result<Vec<Page>> {
        // Counting pass so progress totals are stable before decoding.
        let mut refs = Vec::new();
        for (page_num, page_id) in self.doc.get_pages() {
            let ids = self.image_xobjects(page_id).map_err(|e| {
                Error::ExtractFailed(format!("page {}: {}", page_num, e))
            })?;
            refs.extend(ids);
        }

        if refs.is_empty() {
            // An empty result would produce an empty output document;
            // report failure so the caller rasterizes every page instead.
            return Err(Error::ExtractFailed(
                "document contains no embedded images".into(),
            ));
        }

        let total = refs.len();
        let mut pages = Vec::with_capacity(total);
        for (index, obj_ref) in refs.into_iter().enumerate() {
            cancel.check()?;
            let image = self
                .decode_image_xobject(obj_ref)
                .map_err(|e| Error::ExtractFailed(format!("object {:?}: {}", obj_ref, e)))?;
            pages.push(Page::new(index, image.with_dpi(DEFAULT_DPI), DEFAULT_DPI));
            progress.report(index + 1, total, ProgressPhase::Extracting);
        }

        Ok(pages)
    }

    /// Image XObject references of one page, in storage order.
    fn image_xobjects(&self, page_id: lopdf::ObjectId) -> Result<Vec<lopdf::ObjectId>> {
        let mut ids = Vec::new();

        let page_dict = self.doc.get_dictionary(page_id)?;
        let Ok(res) = page_dict.get(b"Resources") else {
            return Ok(ids);
        };
        let res_dict = match res {
            lopdf::Object::Reference(r) => Some(self.doc.get_dictionary(*r)?),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        };
        let Some(res_dict) = res_dict else {
            return Ok(ids);
        };

        let Ok(xobjects) = res_dict.get(b"XObject") else {
            return Ok(ids);
        };
        let xobj_dict = match xobjects {
            lopdf::Object::Reference(r) => Some(self.doc.get_dictionary(*r)?),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        };
        let Some(xobj_dict) = xobj_dict else {
            return Ok(ids);
        };

        for (_name, obj) in xobj_dict.iter() {
            let obj_ref = obj.as_reference()?;
            if self.is_image_stream(obj_ref)? {
                ids.push(obj_ref);
            }
        }
        Ok(ids)
    }

    fn is_image_stream(&self, obj_ref: lopdf::ObjectId) -> Result<bool> {
        let obj = self.doc.get_object(obj_ref)?;
        if let lopdf::Object::Stream(stream) = obj {
            if let Ok(subtype) = stream.dict.get(b"Subtype") {
                return Ok(matches!(subtype.as_name_str(), Ok("Image")));
            }
        }
        Ok(false)
    }

    /// Decode one image XObject into an RGB buffer.
    fn decode_image_xobject(&self, obj_ref: lopdf::ObjectId) -> Result<RasterImage> {
        let obj = self.doc.get_object(obj_ref)?;
        let lopdf::Object::Stream(stream) = obj else {
            return Err(Error::ImageDecode("XObject is not a stream".into()));
        };
        let dict = &stream.dict;

        let width = dict_u32(dict, b"Width")
            .ok_or_else(|| Error::ImageDecode("missing /Width".into()))?;
        let height = dict_u32(dict, b"Height")
            .ok_or_else(|| Error::ImageDecode("missing /Height".into()))?;

        let filter = dict
            .get(b"Filter")
            .ok()
            .and_then(|f| match f {
                lopdf::Object::Name(n) => String::from_utf8(n.clone()).ok(),
                lopdf::Object::Array(arr) => arr
                    .first()
                    .and_then(|o| o.as_name_str().ok())
                    .map(String::from),
                _ => None,
            })
            .unwrap_or_default();

        match filter.as_str() {
            "DCTDecode" => {
                // JPEG payload, hand it to the image decoder as-is.
                let dyn_img = image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )?;
                RasterImage::from_rgb_image(dyn_img.to_rgb8())
            }
            "FlateDecode" => {
                // lopdf refuses to decompress /Subtype /Image streams, so
                // inflate the payload ourselves.
                let mut raw = Vec::new();
                ZlibDecoder::new(stream.content.as_slice())
                    .read_to_end(&mut raw)
                    .map_err(|e| Error::ImageDecode(format!("inflating image stream: {}", e)))?;
                let raw = apply_predictor(raw, self.decode_parms(dict))?;
                self.raw_to_rgb(dict, width, height, raw)
            }
            "" => self.raw_to_rgb(dict, width, height, stream.content.clone()),
            other => Err(Error::ImageDecode(format!(
                "unsupported image filter {}",
                other
            ))),
        }
    }

    /// The resolved /DecodeParms dictionary of an image stream, if any.
    fn decode_parms<'a>(&'a self, dict: &'a lopdf::Dictionary) -> Option<&'a lopdf::Dictionary> {
        let parms = dict
            .get(b"DecodeParms")
            .or_else(|_| dict.get(b"DP"))
            .ok()?;
        self.resolve_dict(parms)
    }

    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        match obj {
            lopdf::Object::Dictionary(d) => Some(d),
            lopdf::Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            lopdf::Object::Array(arr) => arr.first().and_then(|o| self.resolve_dict(o)),
            _ => None,
        }
    }

    /// Interpret a decompressed sample buffer using the declared geometry.
    fn raw_to_rgb(
        &self,
        dict: &lopdf::Dictionary,
        width: u32,
        height: u32,
        raw: Vec<u8>,
    ) -> Result<RasterImage> {
        let bits = dict_u32(dict, b"BitsPerComponent").unwrap_or(8);
        if bits != 8 {
            return Err(Error::ImageDecode(format!(
                "unsupported bit depth {}",
                bits
            )));
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|cs| match cs {
                lopdf::Object::Name(n) => String::from_utf8(n.clone()).ok(),
                lopdf::Object::Array(arr) => arr
                    .first()
                    .and_then(|o| o.as_name_str().ok())
                    .map(String::from),
                _ => None,
            })
            .unwrap_or_else(|| "DeviceRGB".to_string());

        let px = width as usize * height as usize;
        match color_space.as_str() {
            "DeviceRGB" => {
                if raw.len() < px * 3 {
                    return Err(Error::ImageDecode(format!(
                        "RGB data too short: {} for {}x{}",
                        raw.len(),
                        width,
                        height
                    )));
                }
                RasterImage::from_rgb(width, height, raw[..px * 3].to_vec())
            }
            "DeviceGray" => {
                if raw.len() < px {
                    return Err(Error::ImageDecode(format!(
                        "gray data too short: {} for {}x{}",
                        raw.len(),
                        width,
                        height
                    )));
                }
                let mut rgb = Vec::with_capacity(px * 3);
                for &v in &raw[..px] {
                    rgb.extend_from_slice(&[v, v, v]);
                }
                RasterImage::from_rgb(width, height, rgb)
            }
            other => Err(Error::ImageDecode(format!(
                "unsupported color space {}",
                other
            ))),
        }
    }
}

fn dict_u32(dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

/// Reverse the /DecodeParms predictor applied before Flate compression.
///
/// Predictor 1 (none) passes the data through; 2 is TIFF horizontal
/// differencing; 10..=15 are the PNG row filters, where every row carries
/// a leading filter-type byte.
fn apply_predictor(data: Vec<u8>, parms: Option<&lopdf::Dictionary>) -> Result<Vec<u8>> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let predictor = dict_u32(parms, b"Predictor").unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }

    let colors = dict_u32(parms, b"Colors").unwrap_or(1) as usize;
    let bits = dict_u32(parms, b"BitsPerComponent").unwrap_or(8) as usize;
    let columns = dict_u32(parms, b"Columns").unwrap_or(1) as usize;
    let bpp = (colors * bits).div_ceil(8).max(1);
    let row_len = (colors * bits * columns).div_ceil(8);
    if row_len == 0 {
        return Err(Error::ImageDecode("predictor with zero-width rows".into()));
    }

    match predictor {
        2 => {
            if bits != 8 {
                return Err(Error::ImageDecode(format!(
                    "TIFF predictor with {}-bit samples",
                    bits
                )));
            }
            let mut out = data;
            for row in out.chunks_mut(row_len) {
                for i in bpp..row.len() {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            Ok(out)
        }
        10..=15 => png_unpredict(&data, row_len, bpp),
        other => Err(Error::ImageDecode(format!(
            "unsupported predictor {}",
            other
        ))),
    }
}

fn png_unpredict(data: &[u8], row_len: usize, bpp: usize) -> Result<Vec<u8>> {
    let stride = row_len + 1;
    if data.len() % stride != 0 {
        return Err(Error::ImageDecode(format!(
            "predicted data length {} is not a multiple of row stride {}",
            data.len(),
            stride
        )));
    }

    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks(stride) {
        let mut row = chunk[1..].to_vec();
        match chunk[0] {
            0 => {}
            1 => {
                for i in bpp..row_len {
                    row[i] = row[i].wrapping_add(row[i - bpp]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prev[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { row[i - bpp] as u16 } else { 0 };
                    row[i] = row[i].wrapping_add(((left + prev[i] as u16) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_len {
                    let a = if i >= bpp { row[i - bpp] } else { 0 };
                    let c = if i >= bpp { prev[i - bpp] } else { 0 };
                    row[i] = row[i].wrapping_add(paeth(a, prev[i], c));
                }
            }
            other => {
                return Err(Error::ImageDecode(format!(
                    "unknown PNG row filter {}",
                    other
                )))
            }
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
