//! Page rendering: turn an uploaded document into an ordered sequence of
//! raster pages.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so Tokio worker threads never stall during rendering.
//!
//! ## Document kinds
//!
//! The content type declared at ingress is resolved **once** into a
//! [`DocumentKind`] and dispatched here; no other layer ever inspects MIME
//! strings. A single raster image becomes a one-page document whose
//! "original" display artifact is the raw upload itself. A PDF is rendered
//! page by page, and page 0 is additionally rendered a second time,
//! unmodified, so callers always have an unenhanced reference image even
//! though the main render of page 0 is enhanced later.

use crate::config::ProcessingConfig;
use crate::error::DocfieldError;
use crate::outcome::{Dimensions, Page};
use crate::pipeline::enhance;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Content types accepted at ingress, in the order they are reported back
/// on rejection.
pub const ACCEPTED_CONTENT_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "application/pdf",
];

/// The kind of document being processed, resolved once from the declared
/// content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// One raster image in the given format.
    SingleImage(ImageFormat),
    /// A paginated document (PDF).
    Paginated,
}

impl DocumentKind {
    /// Resolve a declared content type into a kind.
    ///
    /// Rejection is the renderer's only caller-facing error class: the
    /// message names the rejected kind and the accepted set, and is never
    /// retried.
    pub fn from_content_type(kind: &str) -> Result<Self, DocfieldError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::SingleImage(ImageFormat::Jpeg)),
            "image/png" => Ok(Self::SingleImage(ImageFormat::Png)),
            "image/webp" => Ok(Self::SingleImage(ImageFormat::WebP)),
            "image/bmp" => Ok(Self::SingleImage(ImageFormat::Bmp)),
            "image/tiff" => Ok(Self::SingleImage(ImageFormat::Tiff)),
            "application/pdf" => Ok(Self::Paginated),
            other => Err(DocfieldError::UnsupportedFormat {
                kind: other.to_string(),
                accepted: ACCEPTED_CONTENT_TYPES.join(", "),
            }),
        }
    }
}

/// Output of the render stage: pages plus the display reference artifact.
#[derive(Debug)]
pub struct RenderedDocument {
    /// Rendered pages in index order, at most `max_pages` of them.
    pub pages: Vec<Page>,
    /// Total pages in the source document.
    pub total_pages: usize,
    /// Unenhanced reference image (PNG for PDFs, raw upload for images).
    pub original_image: Vec<u8>,
    /// Dimensions of the first page as rendered/decoded.
    pub original_dimensions: Dimensions,
}

/// Render a document into raster pages.
///
/// Structural failures here (undecodable bytes, corrupt PDF) are terminal
/// for the whole document; per-page conditions are handled downstream.
pub async fn render_document(
    bytes: &[u8],
    kind: DocumentKind,
    config: &ProcessingConfig,
) -> Result<RenderedDocument, DocfieldError> {
    match kind {
        DocumentKind::SingleImage(format) => render_single_image(bytes, format),
        DocumentKind::Paginated => {
            let owned = bytes.to_vec();
            let max_pages = config.max_pages;
            let max_dimension = config.max_dimension;
            tokio::task::spawn_blocking(move || {
                render_pdf_blocking(&owned, max_pages, max_dimension)
            })
            .await
            .map_err(|e| DocfieldError::Internal(format!("Render task panicked: {e}")))?
        }
    }
}

/// Decode a single raster image into a one-page document.
///
/// The "original" display artifact is the raw uploaded bytes themselves —
/// no render step, no re-encode.
fn render_single_image(
    bytes: &[u8],
    format: ImageFormat,
) -> Result<RenderedDocument, DocfieldError> {
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DocfieldError::CorruptDocument {
            detail: format!("{e}"),
        })?;
    let original_dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    debug!(
        "Decoded single image: {}x{} px",
        image.width(),
        image.height()
    );

    Ok(RenderedDocument {
        pages: vec![Page {
            index: 0,
            image,
            enhancement_log: Vec::new(),
        }],
        total_pages: 1,
        original_image: bytes.to_vec(),
        original_dimensions,
    })
}

/// Blocking implementation of PDF rendering.
fn render_pdf_blocking(
    bytes: &[u8],
    max_pages: usize,
    max_dimension: u32,
) -> Result<RenderedDocument, DocfieldError> {
    let pdfium = Pdfium::default();

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| DocfieldError::CorruptDocument {
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(DocfieldError::CorruptDocument {
            detail: "document has no pages".to_string(),
        });
    }
    let processed = total_pages.min(max_pages);
    info!("PDF loaded: {total_pages} pages, processing {processed}");

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_dimension as i32)
        .set_maximum_height(max_dimension as i32);

    let mut rendered: Vec<Page> = Vec::with_capacity(processed);

    for idx in 0..processed {
        let page = pages
            .get(idx as u16)
            .map_err(|e| DocfieldError::RenderFailed {
                page: idx,
                detail: format!("{e:?}"),
            })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocfieldError::RenderFailed {
                page: idx,
                detail: format!("{e:?}"),
            })?;

        let image: DynamicImage = bitmap.as_image();
        debug!("Rendered page {idx} → {}x{} px", image.width(), image.height());

        rendered.push(Page {
            index: idx,
            image,
            enhancement_log: Vec::new(),
        });
    }

    // The first page is rendered again, unmodified, as the display
    // reference; the main render above is enhanced in place later.
    let first = &rendered[0].image;
    let original_dimensions = Dimensions {
        width: first.width(),
        height: first.height(),
    };
    let original_image = enhance::encode_png(first)
        .map_err(|e| DocfieldError::Internal(format!("PNG encoding failed: {e}")))?;

    Ok(RenderedDocument {
        pages: rendered,
        total_pages,
        original_image,
        original_dimensions,
    })
}
