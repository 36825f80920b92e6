use std::time::Duration;

use crate::capture::{CaptureRegion, ScreenSource};
use crate::config::{secs, EnchantConfig};
use crate::error::WorkerError;
use crate::input::{Clicker, MouseButton};
use crate::matcher::PhraseSet;
use crate::ocr::TextRecognizer;
use crate::tools::TextScanner;
use crate::worker::{Flow, Tool, WorkerContext};

/// An offered affix: where it is read and the button that picks it
#[derive(Debug, Clone, Copy)]
struct AffixSlot {
    region: CaptureRegion,
    button: (i32, i32),
}

/// Enchant helper.
///
/// Rerolls until one of the offered affixes matches a target, then selects
/// it, clicks replace and finishes. Rolls without a match are dismissed with
/// the close button.
pub struct EnchantTool<S, R, C> {
    scanner: TextScanner<S, R>,
    clicker: C,
    slots: Vec<AffixSlot>,
    targets: PhraseSet,
    enchant_button: (i32, i32),
    replace_button: (i32, i32),
    close_button: (i32, i32),
    click_delay: Duration,
    enchant_delay: Duration,
    replace_delay: Duration,
    loop_delay: Duration,
    error_backoff: Duration,
}

fn point(p: [i32; 2]) -> (i32, i32) {
    (p[0], p[1])
}

impl<S, R, C> EnchantTool<S, R, C>
where
    S: ScreenSource,
    R: TextRecognizer,
    C: Clicker,
{
    /// Regions and scan buttons are paired by index
    pub fn new(config: &EnchantConfig, screen: S, recognizer: R, clicker: C) -> Self {
        let slots = config
            .scan_regions
            .iter()
            .zip(&config.scan_buttons)
            .map(|(region, button)| AffixSlot {
                region: CaptureRegion::from_array(*region),
                button: point(*button),
            })
            .collect();

        Self {
            scanner: TextScanner::new(screen, recognizer),
            clicker,
            slots,
            targets: PhraseSet::new(&config.target_words),
            enchant_button: point(config.enchant_button),
            replace_button: point(config.replace_button),
            close_button: point(config.close_button),
            click_delay: secs(config.click_delay),
            enchant_delay: secs(config.enchant_delay),
            replace_delay: secs(config.replace_delay),
            loop_delay: secs(config.loop_delay),
            error_backoff: secs(config.error_backoff),
        }
    }

    /// Left click followed by the click delay; `false` if stopped meanwhile
    fn click(&mut self, ctx: &WorkerContext, (x, y): (i32, i32)) -> Result<bool, WorkerError> {
        self.clicker.click(x, y, MouseButton::Left)?;
        Ok(ctx.sleep(self.click_delay))
    }
}

impl<S, R, C> Tool for EnchantTool<S, R, C>
where
    S: ScreenSource,
    R: TextRecognizer,
    C: Clicker,
{
    fn name(&self) -> &'static str {
        "enchant"
    }

    fn iterate(&mut self, ctx: &WorkerContext) -> Result<Flow, WorkerError> {
        self.click(ctx, self.enchant_button)?;
        ctx.update("Clicked Enchant button");
        if !ctx.sleep(self.enchant_delay) {
            return Ok(Flow::Continue);
        }

        for index in 0..self.slots.len() {
            let slot = self.slots[index];
            let text = self.scanner.scan(slot.region);
            ctx.update(format!("Scanning region {}: {}", index + 1, text));

            let Some(target) = self.targets.first_match(&text).map(str::to_owned) else {
                continue;
            };

            self.click(ctx, slot.button)?;
            ctx.update(format!(
                "Found '{}' in region {} and clicked its button",
                target,
                index + 1
            ));

            if !ctx.sleep(self.replace_delay) {
                return Ok(Flow::Continue);
            }
            self.click(ctx, self.replace_button)?;
            ctx.update("Clicked Replace button");
            ctx.update("Target found and replaced. Process stopped.");
            return Ok(Flow::Finished);
        }

        self.click(ctx, self.close_button)?;
        ctx.update("Target not found, clicked Close button");
        Ok(Flow::Continue)
    }

    fn loop_delay(&self) -> Duration {
        self.loop_delay
    }

    fn error_backoff(&self) -> Duration {
        self.error_backoff
    }
}
