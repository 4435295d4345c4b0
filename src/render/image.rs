//! Image to PDF rendering.
//!
//! The image is decoded with content-based format guessing (the stored
//! filename extension comes from the caller and is untrusted), converted to
//! RGB, and embedded as a single XObject on a page whose media box matches
//! the pixel dimensions: one image, one page, no scaling decisions.

use crate::error::DocpressError;
use crate::registry::Converter;
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

/// Renders `image/*` documents to a single-page PDF.
pub struct ImageConverter;

#[async_trait]
impl Converter for ImageConverter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn supports(&self, media_type: &str, _filename: &str) -> bool {
        media_type.starts_with("image/")
    }

    async fn convert(&self, source: &Path, dest: &Path) -> Result<(), DocpressError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let doc = build_pdf(&source)?;
            super::save_atomic(doc, &dest, "image")
        })
        .await
        .map_err(|e| DocpressError::ConversionFailed {
            strategy: "image",
            detail: format!("render task panicked: {e}"),
        })?
    }
}

fn build_pdf(source: &Path) -> Result<Document, DocpressError> {
    let failed = |detail: String| DocpressError::ConversionFailed {
        strategy: "image",
        detail,
    };

    let reader = image::ImageReader::open(source)
        .map_err(|e| DocpressError::storage(source, e))?
        .with_guessed_format()
        .map_err(|e| DocpressError::storage(source, e))?;
    let img = reader
        .decode()
        .map_err(|e| failed(format!("image decode: {e}")))?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (w, h) = (width as i64, height as i64);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => w,
            "Height" => h,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| failed(format!("content encode: {e}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), w.into(), h.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}
