/// The automated tasks
///
/// - `restock`: buy target items from a vendor, restocking until one shows up
/// - `enchant`: reroll an affix until a target affix is offered, then take it
/// - `kurast`: find the portal on screen and run the click sequence once
///
/// Each tool is generic over its collaborators and implements
/// `worker::Tool`, so the hosting thread only ever sees the trait.
pub mod enchant;
pub mod kurast;
pub mod restock;

pub use enchant::EnchantTool;
pub use kurast::KurastTool;
pub use restock::RestockTool;

use crate::capture::{CaptureRegion, ScreenSource};
use crate::ocr::TextRecognizer;

/// Capture plus OCR for one region at a time
pub struct TextScanner<S, R> {
    screen: S,
    recognizer: R,
}

impl<S: ScreenSource, R: TextRecognizer> TextScanner<S, R> {
    pub fn new(screen: S, recognizer: R) -> Self {
        Self { screen, recognizer }
    }

    /// Text visible in `region`, trimmed.
    ///
    /// Capture and OCR failures read as empty text so a single bad frame
    /// only costs one scan.
    pub fn scan(&mut self, region: CaptureRegion) -> String {
        let image = match self.screen.capture(region) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Capture of {:?} failed: {}", region.to_array(), e);
                return String::new();
            }
        };

        match self.recognizer.recognize(&image) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!("OCR of {:?} failed: {}", region.to_array(), e);
                String::new()
            }
        }
    }
}
