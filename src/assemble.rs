//! Output document assembly.
//!
//! Packs an ordered sequence of restored page images into one PDF. Every
//! image gets its own A4 page; the image keeps its pixels (Flate-compressed
//! raw RGB, no recompression loss) and is scaled uniformly to fit the page,
//! centered on both axes. The file is written through a temporary sibling
//! and renamed into place, so a failed assembly leaves nothing behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{Error, Result};
use crate::model::Page;
use crate::pipeline::CancelToken;
use crate::progress::{ProgressPhase, ProgressSink};

/// ISO A4 width in PDF points (210 mm).
pub const A4_WIDTH_PT: f64 = 595.276;
/// ISO A4 height in PDF points (297 mm).
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Resolution tag attached to embedded images.
const OUTPUT_DPI: f64 = 300.0;

/// Builds the output PDF from processed pages.
#[derive(Debug, Clone, Default)]
pub struct PageAssembler;

impl PageAssembler {
    /// Create an assembler with the fixed A4 / 300 dpi layout policy.
    pub fn new() -> Self {
        Self
    }

    /// Assemble `pages` into a PDF at `output`, preserving order.
    ///
    /// Emits one progress event per embedded page (phase "assembling
    /// document"). On success the output file exists and is complete; on
    /// any failure no file is left at `output`. `cancel` is checked before
    /// each page is added.
    pub fn assemble<P: AsRef<Path>>(
        &self,
        pages: &[Page],
        output: P,
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let output = output.as_ref();
        if pages.is_empty() {
            return Err(Error::Assembly("no pages to assemble".into()));
        }

        let mut doc = self.build_document(pages, progress, cancel)?;

        let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        doc.save_to(&mut tmp)
            .map_err(|e| Error::Assembly(format!("writing output: {}", e)))?;
        tmp.flush()?;
        tmp.persist(output)
            .map_err(|e| Error::Assembly(format!("moving output into place: {}", e)))?;

        Ok(output.to_path_buf())
    }

    /// Build the in-memory PDF document.
    pub fn build_document(
        &self,
        pages: &[Page],
        progress: &ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let total = pages.len();
        let mut kids = Vec::with_capacity(total);
        for (i, page) in pages.iter().enumerate() {
            cancel.check()?;
            let page_id = self.add_page(&mut doc, pages_id, page)?;
            kids.push(Object::Reference(page_id));
            progress.report(i + 1, total, ProgressPhase::Assembling);
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("unrule ", env!("CARGO_PKG_VERSION"))),
            "CreationDate" => Object::string_literal(pdf_date_now()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        Ok(doc)
    }

    /// Add one A4 page with its image XObject and content stream.
    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: lopdf::ObjectId,
        page: &Page,
    ) -> Result<lopdf::ObjectId> {
        let image = &page.image;
        let (width, height) = image.dimensions();

        let compressed = {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(image.data())?;
            encoder
                .finish()
                .map_err(|e| Error::Assembly(format!("compressing image data: {}", e)))?
        };

        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            compressed,
        );
        let image_id = doc.add_object(image_stream);

        let (draw_w, draw_h, offset_x, offset_y) = fit_to_a4(width, height, page.dpi);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(draw_w as f32),
                        0.into(),
                        0.into(),
                        Object::Real(draw_h as f32),
                        Object::Real(offset_x as f32),
                        Object::Real(offset_y as f32),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::Assembly(format!("encoding content stream: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(A4_WIDTH_PT as f32),
                Object::Real(A4_HEIGHT_PT as f32),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });

        Ok(page_id)
    }
}

/// Placement of a `width` x `height` pixel image on an A4 page.
///
/// The image's nominal physical size comes from its resolution tag
/// (`px / dpi` inches); it is then scaled uniformly so it fits inside A4
/// without cropping or distortion, and centered on both axes. Returns
/// `(draw_width_pt, draw_height_pt, offset_x_pt, offset_y_pt)`.
pub fn fit_to_a4(width: u32, height: u32, dpi: u32) -> (f64, f64, f64, f64) {
    let dpi = if dpi == 0 { OUTPUT_DPI } else { dpi as f64 };
    let nominal_w = width as f64 / dpi * 72.0;
    let nominal_h = height as f64 / dpi * 72.0;

    let scale = (A4_WIDTH_PT / nominal_w).min(A4_HEIGHT_PT / nominal_h);
    let draw_w = nominal_w * scale;
    let draw_h = nominal_h * scale;
    let offset_x = (A4_WIDTH_PT - draw_w) / 2.0;
    let offset_y = (A4_HEIGHT_PT - draw_h) / 2.0;
    (draw_w, draw_h, offset_x, offset_y)
}

/// Current time in the PDF date format (D:YYYYMMDDHHmmSS).
fn pdf_date_now() -> String {
    chrono::Utc::now().format("D:%Y%m%d%H%M%S").to_string()
}
