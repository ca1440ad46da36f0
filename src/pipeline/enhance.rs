//! Image enhancement: a fixed, deterministic filter chain applied to each
//! rendered page before OCR.
//!
//! Identical input bytes always produce identical cleaned bytes and an
//! identical log — every filter parameter is a constant. The chain is tuned
//! for scanned business documents: normalise orientation, bound the pixel
//! budget, lift contrast for faded print, then a denoise/re-sharpen pair
//! that removes scanner grain without softening glyph edges.
//!
//! Each applied step appends one human-readable entry to the page's
//! enhancement log, in application order. This stage raises no errors:
//! malformed image bytes were already rejected by the renderer.

use exif::{In, Tag};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Contrast boost applied to every page.
const CONTRAST_BOOST: f32 = 15.0;
/// Brightness boost: +5% of the 8-bit range.
const BRIGHTNESS_BOOST: i32 = 13;
/// 3×3 edge-sharpen kernel.
const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
/// Mild Gaussian blur sigma for the denoise pass.
const DENOISE_SIGMA: f32 = 0.8;
/// Unsharp-mask parameters for the recovery pass after denoising.
const RESHARPEN_SIGMA: f32 = 1.5;
const RESHARPEN_THRESHOLD: i32 = 3;

/// Read the EXIF orientation value (1–8) from raw image bytes, if present.
///
/// Only JPEG and TIFF uploads carry EXIF; PDF renders never do.
pub fn exif_orientation(bytes: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Apply the fixed enhancement chain to one page.
///
/// Returns the cleaned image (a new buffer — the input is not mutated) and
/// the ordered log of steps applied.
pub fn enhance(
    image: &DynamicImage,
    orientation: Option<u32>,
    max_dimension: u32,
) -> (DynamicImage, Vec<String>) {
    let mut log = Vec::new();

    // 1. Auto-orient using embedded rotation metadata.
    let mut cleaned = match orientation {
        Some(o @ 2..=8) => {
            let oriented = apply_orientation(image, o);
            log.push(format!("Auto-oriented image (EXIF orientation {o})"));
            oriented
        }
        _ => image.clone(),
    };

    // 2. Downscale when the longer side exceeds the maximum dimension.
    let longer = cleaned.width().max(cleaned.height());
    if longer > max_dimension {
        cleaned = cleaned.resize(max_dimension, max_dimension, FilterType::Lanczos3);
        log.push(format!(
            "Downscaled to {}x{} (max dimension {max_dimension}px)",
            cleaned.width(),
            cleaned.height()
        ));
    }

    // 3. Contrast, brightness, then edge sharpen — in that order.
    cleaned = cleaned.adjust_contrast(CONTRAST_BOOST);
    log.push("Boosted contrast (+15%)".to_string());

    cleaned = cleaned.brighten(BRIGHTNESS_BOOST);
    log.push("Boosted brightness (+5%)".to_string());

    cleaned = cleaned.filter3x3(&SHARPEN_KERNEL);
    log.push("Applied edge sharpening".to_string());

    // 4. Mild denoise blur, then a stronger sharpen to recover detail.
    cleaned = cleaned.blur(DENOISE_SIGMA);
    log.push("Applied denoising blur".to_string());

    cleaned = cleaned.unsharpen(RESHARPEN_SIGMA, RESHARPEN_THRESHOLD);
    log.push("Re-sharpened after denoise".to_string());

    debug!(
        "Enhanced page: {}x{} → {}x{}, {} steps",
        image.width(),
        image.height(),
        cleaned.width(),
        cleaned.height(),
        log.len()
    );

    (cleaned, log)
}

/// Map an EXIF orientation value onto image transforms.
fn apply_orientation(image: &DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image.clone(),
    }
}

/// Losslessly encode an image as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
