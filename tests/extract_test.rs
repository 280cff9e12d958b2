//! Integration tests for embedded-image extraction.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, Stream};

use unrule::{CancelToken, Error, PageImageExtractor, ProgressPhase, ProgressSink};

/// Build a PDF where each page embeds one solid-color RGB image.
///
/// `colors[i]` becomes the fill of page i's image, so extraction order is
/// observable in the output.
fn pdf_with_embedded_images(colors: &[[u8; 3]], w: u32, h: u32) -> Vec<u8> {
    build_pdf(colors, w, h, |rgb| {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb).unwrap();
        (b"FlateDecode".to_vec(), encoder.finish().unwrap())
    })
}

/// Build a PDF whose images use a filter the extractor cannot decode.
fn pdf_with_undecodable_images(colors: &[[u8; 3]], w: u32, h: u32) -> Vec<u8> {
    build_pdf(colors, w, h, |rgb| (b"JPXDecode".to_vec(), rgb.to_vec()))
}

fn build_pdf(
    colors: &[[u8; 3]],
    w: u32,
    h: u32,
    encode: impl Fn(&[u8]) -> (Vec<u8>, Vec<u8>),
) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for color in colors {
        let mut rgb = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..w * h {
            rgb.extend_from_slice(color);
        }
        let (filter, payload) = encode(&rgb);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => w as i64,
                "Height" => h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => Object::Name(filter),
            },
            payload,
        ));

        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"q 100 0 0 100 0 0 cm /Im0 Do Q".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => colors.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[test]
fn extracts_one_image_per_page_in_order() {
    let colors = [[200, 10, 10], [10, 200, 10], [10, 10, 200], [99, 99, 99]];
    let data = pdf_with_embedded_images(&colors, 24, 16);

    let extractor = PageImageExtractor::from_bytes(&data).unwrap();
    assert_eq!(extractor.page_count(), 4);

    let pages = extractor.extract(&ProgressSink::sink_only(), &CancelToken::new()).unwrap();
    assert_eq!(pages.len(), 4);

    for (i, page) in pages.iter().enumerate() {
        assert_eq!(page.index, i);
        assert_eq!(page.dimensions(), (24, 16));
        assert_eq!(page.image.pixel(0, 0), colors[i], "page {}", i);
        assert_eq!(page.dpi, 300);
    }
}

#[test]
fn extraction_reports_progress_with_stable_total() {
    let colors = [[1, 2, 3], [4, 5, 6], [7, 8, 9]];
    let data = pdf_with_embedded_images(&colors, 8, 8);

    let extractor = PageImageExtractor::from_bytes(&data).unwrap();
    let (sink, rx) = ProgressSink::channel();
    extractor.extract(&sink, &CancelToken::new()).unwrap();
    drop(sink);

    let events: Vec<_> = rx.iter().collect();
    assert_eq!(events.len(), 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.completed, i + 1);
        assert_eq!(event.total, 3);
        assert_eq!(event.phase, ProgressPhase::Extracting);
    }
}

#[test]
fn any_undecodable_image_fails_the_whole_document() {
    let data = pdf_with_undecodable_images(&[[0, 0, 0], [1, 1, 1]], 8, 8);

    let extractor = PageImageExtractor::from_bytes(&data).unwrap();
    let result = extractor.extract(&ProgressSink::sink_only(), &CancelToken::new());
    assert!(matches!(result, Err(Error::ExtractFailed(_))));
}

#[test]
fn document_without_images_fails_extraction() {
    // Pages but no XObjects at all
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();

    let extractor = PageImageExtractor::from_bytes(&bytes).unwrap();
    let result = extractor.extract(&ProgressSink::sink_only(), &CancelToken::new());
    assert!(matches!(result, Err(Error::ExtractFailed(_))));
}

#[test]
fn info_counts_pages_and_images() {
    let data = pdf_with_embedded_images(&[[5, 5, 5], [6, 6, 6]], 10, 10);
    let extractor = PageImageExtractor::from_bytes(&data).unwrap();
    let info = extractor.info();

    assert_eq!(info.page_count, 2);
    assert_eq!(info.embedded_images, 2);
    assert!(!info.encrypted);
    assert!(info.has_embedded_images());
}

#[test]
fn grayscale_images_are_expanded_to_rgb() {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let gray: Vec<u8> = vec![128; 6 * 4];
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&gray).unwrap();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 6,
            "Height" => 4,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        encoder.finish().unwrap(),
    ));
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();

    let extractor = PageImageExtractor::from_bytes(&bytes).unwrap();
    let pages = extractor.extract(&ProgressSink::sink_only(), &CancelToken::new()).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].image.pixel(3, 2), [128, 128, 128]);
}

#[test]
fn cancel_before_decode_stops_extraction() {
    let data = pdf_with_embedded_images(&[[1, 1, 1], [2, 2, 2]], 8, 8);
    let extractor = PageImageExtractor::from_bytes(&data).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let result = extractor.extract(&ProgressSink::sink_only(), &token);
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn predictor_encoded_flate_images_are_decoded() {
    // 4x2 solid (10,20,30), PNG Sub-filtered per row before compression
    let mut predicted = Vec::new();
    for _ in 0..2 {
        predicted.push(1u8);
        predicted.extend_from_slice(&[10, 20, 30]);
        predicted.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&predicted).unwrap();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 4,
            "Height" => 2,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "DecodeParms" => dictionary! {
                "Predictor" => 15,
                "Colors" => 3,
                "BitsPerComponent" => 8,
                "Columns" => 4,
            },
        },
        encoder.finish().unwrap(),
    ));
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();

    let extractor = PageImageExtractor::from_bytes(&bytes).unwrap();
    let pages = extractor
        .extract(&ProgressSink::sink_only(), &CancelToken::new())
        .unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].dimensions(), (4, 2));
    for y in 0..2 {
        for x in 0..4 {
            assert_eq!(pages[0].image.pixel(x, y), [10, 20, 30]);
        }
    }
}
