//! Text recognition: extract raw unstructured text from a cleaned page.
//!
//! Recognition failure is an expected, non-fatal condition: a blank page, a
//! photo with no text, or even a broken engine install all surface as empty
//! text, never as an error. The empty-text sentinel is handled at the page
//! pipeline level, which substitutes a caller-facing placeholder.
//!
//! The engine sits behind the [`TextRecognizer`] trait so tests (and callers
//! with their own OCR stack) can inject an implementation through
//! [`crate::config::ProcessingConfig::recognizer`]. The default engine is
//! Tesseract via `leptess`, compiled in under the `tesseract` feature.

use image::DynamicImage;

/// Recognises text in one cleaned page image.
///
/// Implementations must treat internal engine failure as "no text": the
/// return value may be empty but the call itself never fails.
pub trait TextRecognizer: Send + Sync {
    /// Engine identifier for logs.
    fn name(&self) -> &'static str;

    /// Extract raw text from the image. Empty when nothing was recognised.
    fn recognize(&self, image: &DynamicImage) -> String;
}

/// Recognizer used when the `tesseract` feature is disabled and no custom
/// recognizer was injected: every page reads as blank.
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn recognize(&self, _image: &DynamicImage) -> String {
        String::new()
    }
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract {
    use super::TextRecognizer;
    use image::{DynamicImage, ImageFormat};
    use leptess::LepTess;
    use std::io::Cursor;
    use tracing::warn;

    /// Tesseract-backed recognizer.
    ///
    /// A fresh `LepTess` is initialised per call: the binding is not `Sync`,
    /// and pages are recognised concurrently on blocking threads. Engine
    /// init cost is negligible next to recognition itself.
    pub struct TesseractRecognizer {
        language: String,
    }

    impl TesseractRecognizer {
        pub fn new(language: impl Into<String>) -> Self {
            Self {
                language: language.into(),
            }
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn name(&self) -> &'static str {
            "tesseract"
        }

        fn recognize(&self, image: &DynamicImage) -> String {
            // leptess consumes encoded image data; PNG keeps glyph edges
            // exact after the enhancement chain.
            let mut png = Cursor::new(Vec::new());
            if let Err(e) = image.write_to(&mut png, ImageFormat::Png) {
                warn!("OCR skipped: PNG encoding failed: {e}");
                return String::new();
            }

            let mut engine = match LepTess::new(None, &self.language) {
                Ok(engine) => engine,
                Err(e) => {
                    warn!(
                        "OCR skipped: Tesseract init failed for language '{}': {e}",
                        self.language
                    );
                    return String::new();
                }
            };

            if let Err(e) = engine.set_image_from_mem(png.get_ref()) {
                warn!("OCR skipped: could not set image: {e}");
                return String::new();
            }

            match engine.get_utf8_text() {
                Ok(text) => text,
                Err(e) => {
                    warn!("OCR produced no text: {e}");
                    String::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn null_recognizer_reports_blank() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        assert_eq!(NullRecognizer.recognize(&img), "");
        assert_eq!(NullRecognizer.name(), "null");
    }
}
