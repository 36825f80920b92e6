/// OCR for captured screen regions
///
/// - `preprocessing`: grayscale, thresholding, noise reduction
/// - `detection`: Tesseract integration
///
/// Tools only see the `TextRecognizer` trait, so the polling logic can be
/// exercised with scripted text in tests.
mod detection;
mod preprocessing;

use detection::TesseractDetector;
use image::RgbaImage;
use preprocessing::ImagePreprocessor;

use crate::error::OcrError;

/// Turns a captured image into text
pub trait TextRecognizer {
    fn recognize(&mut self, image: &RgbaImage) -> Result<String, OcrError>;
}

/// Preprocessing plus Tesseract behind one call
///
/// # Example
/// ```no_run
/// use d4_assistant::ocr::{OcrManager, TextRecognizer};
/// use image::RgbaImage;
///
/// let mut ocr = OcrManager::new_with_options(0, false)?;
/// let image = RgbaImage::new(200, 40);
/// let text = ocr.recognize(&image)?;
/// tracing::info!("read: {}", text);
/// # Ok::<(), d4_assistant::error::OcrError>(())
/// ```
pub struct OcrManager {
    preprocessor: ImagePreprocessor,
    detector: TesseractDetector,
}

impl OcrManager {
    /// # Arguments
    /// * `threshold` - Manual threshold value (0 = automatic Otsu thresholding)
    /// * `enable_morph_open` - Enable morphological opening for noise reduction
    pub fn new_with_options(threshold: u8, enable_morph_open: bool) -> Result<Self, OcrError> {
        let preprocessor = ImagePreprocessor::new(threshold, enable_morph_open);
        let detector = TesseractDetector::new()?;

        tracing::info!(
            "  Threshold: {}",
            if threshold == 0 {
                "Automatic (Otsu)".to_string()
            } else {
                format!("Manual ({})", threshold)
            }
        );
        tracing::info!(
            "  Morphological opening: {}",
            if enable_morph_open { "Enabled" } else { "Disabled" }
        );

        Ok(Self {
            preprocessor,
            detector,
        })
    }
}

impl TextRecognizer for OcrManager {
    /// Main pass first; per-channel passes only when it reads nothing
    fn recognize(&mut self, image: &RgbaImage) -> Result<String, OcrError> {
        let binary = self.preprocessor.preprocess(image);
        let text = self.detector.detect_text(&binary)?;
        if !text.is_empty() {
            return Ok(text);
        }

        let alternatives = self.preprocessor.alternatives(image);
        self.detector.detect_text_multi(&alternatives)
    }
}
