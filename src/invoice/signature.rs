//! Signature compositing.
//!
//! Overlays a tenant's signature/stamp image onto the first page of the
//! converted PDF and returns the finished document as in-memory bytes. The
//! raster is re-encoded as JPEG and embedded as a DCTDecode image XObject,
//! placed with a `q cm Do Q` sequence appended to the page content.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde::Deserialize;
use thiserror::Error;

const XOBJECT_NAME: &str = "ImSig";
const JPEG_QUALITY: u8 = 90;
// A4 portrait height, used when no MediaBox can be resolved.
const FALLBACK_PAGE_HEIGHT: f32 = 842.0;

/// Placement rectangle in page points, measured from the top-left corner of
/// the page (the convention the tenant configs were written in).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SignatureRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for SignatureRect {
    /// Shared stamp geometry used by tenants that do not override placement.
    fn default() -> Self {
        Self {
            x: 620.0,
            y: 370.0,
            width: 100.0,
            height: 100.0,
        }
    }
}

impl SignatureRect {
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Errors from the compositing step.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature image not found")]
    ImageMissing,
    #[error("failed to decode signature image: {0}")]
    ImageDecode(#[source] image::ImageError),
    #[error("failed to encode signature image: {0}")]
    ImageEncode(#[source] image::ImageError),
    #[error("failed to read or edit PDF document: {0}")]
    Document(#[source] lopdf::Error),
    #[error("failed to write edited PDF document: {0}")]
    Write(#[source] std::io::Error),
    #[error("PDF document has no pages")]
    NoPages,
}

/// Stamp `image_path` onto the first page of the PDF at `pdf_path` within
/// `rect`, returning the edited document as bytes. The source file on disk
/// is left as-is; no second copy is retained.
pub fn stamp_signature(
    pdf_path: &Path,
    image_path: &Path,
    rect: &SignatureRect,
) -> Result<Vec<u8>, SignatureError> {
    if !image_path.exists() {
        return Err(SignatureError::ImageMissing);
    }

    let mut doc = Document::load(pdf_path).map_err(SignatureError::Document)?;
    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or(SignatureError::NoPages)?;

    let decoded = image::open(image_path).map_err(SignatureError::ImageDecode)?;
    // JPEG has no alpha channel; composite onto white so transparent
    // backgrounds do not collapse into black.
    let raster = flatten_onto_white(&decoded.to_rgba8());
    let (width_px, height_px) = raster.dimensions();

    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, JPEG_QUALITY)
        .encode(raster.as_raw(), width_px, height_px, image::ColorType::Rgb8)
        .map_err(SignatureError::ImageEncode)?;

    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width_px as i64,
            "Height" => height_px as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg_bytes,
    ));

    // Configured rect is top-left based; PDF user space grows from the
    // bottom-left, so flip against the page height.
    let page_height = page_height(&doc, page_id);
    let y_bottom = page_height - rect.y - rect.height;

    doc.add_xobject(page_id, XOBJECT_NAME.as_bytes(), xobject_id)
        .map_err(SignatureError::Document)?;
    doc.add_to_page_content(
        page_id,
        Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        rect.width.into(),
                        0.into(),
                        0.into(),
                        rect.height.into(),
                        rect.x.into(),
                        y_bottom.into(),
                    ],
                ),
                Operation::new("Do", vec![XOBJECT_NAME.into()]),
                Operation::new("Q", vec![]),
            ],
        },
    )
    .map_err(SignatureError::Document)?;

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(SignatureError::Write)?;
    Ok(bytes)
}

/// MediaBox height for the page, following the Parent chain since the box is
/// commonly inherited from the pages node.
fn page_height(doc: &Document, page_id: lopdf::ObjectId) -> f32 {
    let mut current = page_id;
    for _ in 0..8 {
        let Ok(dict) = doc.get_dictionary(current) else {
            break;
        };
        if let Ok(media_box) = dict.get(b"MediaBox") {
            let resolved = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
            if let Some(Ok(arr)) = resolved.map(|o| o.as_array()) {
                if arr.len() == 4 {
                    return object_to_f32(&arr[3]) - object_to_f32(&arr[1]);
                }
            }
        }
        match dict.get(b"Parent").and_then(|p| p.as_reference()) {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    FALLBACK_PAGE_HEIGHT
}

fn flatten_onto_white(rgba: &image::RgbaImage) -> image::RgbImage {
    let (width, height) = rgba.dimensions();
    image::RgbImage::from_fn(width, height, |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = pixel[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        image::Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])])
    })
}

fn object_to_f32(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r,
        _ => 0.0,
    }
}
