//! Tesseract OCR
//!
//! Owns the Tesseract instance and runs it on already-binarized images.

use image::GrayImage;
use leptess::{LepTess, Variable};
use std::path::PathBuf;

use crate::error::OcrError;

pub struct TesseractDetector {
    tess: LepTess,
    scratch_path: PathBuf,
}

impl TesseractDetector {
    /// Initialize Tesseract with English data
    ///
    /// Looks for a `tessdata` directory next to the executable first, then
    /// falls back to the system installation (`TESSDATA_PREFIX` or the
    /// compiled-in default).
    pub fn new() -> Result<Self, OcrError> {
        tracing::info!("Initializing Tesseract OCR...");

        let data_path = Self::bundled_tessdata();
        let mut tess = match data_path.as_deref().and_then(|p| p.to_str()) {
            Some(path) => {
                tracing::info!("Using bundled Tesseract data from {}", path);
                LepTess::new(Some(path), "eng")
            }
            None => LepTess::new(None, "eng"),
        }
        .map_err(|e| OcrError::InitFailed(Box::new(e)))?;

        // PSM 6 = assume a single uniform block of text (tooltip lines)
        tess.set_variable(Variable::TesseditPagesegMode, "6")
            .map_err(|e| OcrError::InitFailed(Box::new(e)))?;

        // One scratch file per process so several tools can run side by side
        let scratch_path =
            std::env::temp_dir().join(format!("d4_assistant_ocr_{}.png", std::process::id()));

        tracing::info!("✓ Tesseract OCR initialized");
        Ok(Self { tess, scratch_path })
    }

    fn bundled_tessdata() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        let dir = exe.parent()?.join("tessdata");
        dir.is_dir().then_some(dir)
    }

    /// Run OCR on a binary image and return the trimmed text
    pub fn detect_text(&mut self, binary_image: &GrayImage) -> Result<String, OcrError> {
        // leptess reads images from disk
        binary_image
            .save(&self.scratch_path)
            .map_err(OcrError::ScratchImageFailed)?;

        let result = self
            .tess
            .set_image(&self.scratch_path)
            .map_err(|e| OcrError::RecognitionFailed(Box::new(e)))
            .and_then(|_| {
                self.tess
                    .get_utf8_text()
                    .map_err(|e| OcrError::RecognitionFailed(Box::new(e)))
            });

        let _ = std::fs::remove_file(&self.scratch_path);

        let text = result?.trim().to_string();
        if !text.is_empty() {
            tracing::debug!("[ocr] {}", text.replace('\n', " | "));
        }
        Ok(text)
    }

    /// Run OCR on several candidates and return the first non-empty text
    pub fn detect_text_multi(&mut self, images: &[GrayImage]) -> Result<String, OcrError> {
        for image in images {
            let text = self.detect_text(image)?;
            if !text.is_empty() {
                return Ok(text);
            }
        }
        Ok(String::new())
    }
}

impl Drop for TesseractDetector {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.scratch_path);
    }
}
