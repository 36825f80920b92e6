use std::time::Duration;

use crate::capture::{CaptureRegion, ScreenSource};
use crate::config::{secs, RestockConfig};
use crate::error::WorkerError;
use crate::input::{Clicker, MouseButton};
use crate::matcher::PhraseSet;
use crate::ocr::TextRecognizer;
use crate::tools::TextScanner;
use crate::worker::{Flow, Tool, WorkerContext};

/// Vendor restock helper.
///
/// Each round reads every vendor slot in order. The first slot showing a
/// target item is right-clicked (bought); when no slot matches, the restock
/// button is clicked to refresh the stock. Runs until stopped.
pub struct RestockTool<S, R, C> {
    scanner: TextScanner<S, R>,
    clicker: C,
    regions: Vec<CaptureRegion>,
    targets: PhraseSet,
    restock_button: (i32, i32),
    click_delay: Duration,
    loop_delay: Duration,
    error_backoff: Duration,
}

impl<S, R, C> RestockTool<S, R, C>
where
    S: ScreenSource,
    R: TextRecognizer,
    C: Clicker,
{
    pub fn new(config: &RestockConfig, screen: S, recognizer: R, clicker: C) -> Self {
        Self {
            scanner: TextScanner::new(screen, recognizer),
            clicker,
            regions: config
                .scan_regions
                .iter()
                .copied()
                .map(CaptureRegion::from_array)
                .collect(),
            targets: PhraseSet::new(&config.target_words),
            restock_button: (config.restock_button[0], config.restock_button[1]),
            click_delay: secs(config.click_delay),
            loop_delay: secs(config.loop_delay),
            error_backoff: secs(config.error_backoff),
        }
    }
}

impl<S, R, C> Tool for RestockTool<S, R, C>
where
    S: ScreenSource,
    R: TextRecognizer,
    C: Clicker,
{
    fn name(&self) -> &'static str {
        "restock"
    }

    fn iterate(&mut self, ctx: &WorkerContext) -> Result<Flow, WorkerError> {
        for (index, region) in self.regions.iter().enumerate() {
            if ctx.is_stopped() {
                return Ok(Flow::Continue);
            }

            let text = self.scanner.scan(*region);
            ctx.update(format!("Scanning region {}: {}", index + 1, text));

            if let Some(target) = self.targets.first_match(&text) {
                let (x, y) = region.center();
                self.clicker.click(x, y, MouseButton::Right)?;
                ctx.update(format!("Found '{}' in region {}", target, index + 1));
                return Ok(Flow::Continue);
            }
        }

        let (x, y) = self.restock_button;
        self.clicker.click(x, y, MouseButton::Left)?;
        ctx.sleep(self.click_delay);
        ctx.update("Clicked Restock button");
        Ok(Flow::Continue)
    }

    fn loop_delay(&self) -> Duration {
        self.loop_delay
    }

    fn error_backoff(&self) -> Duration {
        self.error_backoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fakes::{Action, FakeOcr, FakeScreen, RecordingClicker};
    use crate::worker::{StopToken, WorkerEvent};
    use crossbeam_channel::{unbounded, Receiver};

    fn config() -> RestockConfig {
        RestockConfig {
            restock_button: [900, 700],
            scan_regions: (0..8).map(|i| [100 + i * 60, 300, 50, 20]).collect(),
            target_words: vec!["Obducite".to_string(), "  Gem Fragment ".to_string()],
            click_delay: 0.0,
            ..RestockConfig::default()
        }
    }

    fn context() -> (WorkerContext, Receiver<WorkerEvent>) {
        let (tx, rx) = unbounded();
        (WorkerContext::new(StopToken::new(), tx), rx)
    }

    fn updates(rx: &Receiver<WorkerEvent>) -> Vec<String> {
        rx.try_iter()
            .filter_map(|event| match event {
                WorkerEvent::Update(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_buys_first_matching_slot() {
        let screen = FakeScreen::default();
        let captured = screen.captured.clone();
        let clicker = RecordingClicker::default();
        let actions = clicker.log();
        let ocr = FakeOcr::new(["Iron Chunk", "Rare gem fragmnt", "Obducite"]);
        let mut tool = RestockTool::new(&config(), screen, ocr, clicker);
        let (ctx, rx) = context();

        assert_eq!(tool.iterate(&ctx).unwrap(), Flow::Continue);

        // Slot 2 (x = 160) matches on the "gem" + "fragm" window; slot 3 is never read
        assert_eq!(captured.borrow().len(), 2);
        assert_eq!(*actions.borrow(), vec![Action::Click(185, 310, MouseButton::Right)]);

        let messages = updates(&rx);
        assert_eq!(messages[0], "Scanning region 1: Iron Chunk");
        assert_eq!(messages[2], "Found 'Gem Fragment' in region 2");
    }

    #[test]
    fn test_restocks_when_nothing_matches() {
        let clicker = RecordingClicker::default();
        let actions = clicker.log();
        let mut tool = RestockTool::new(&config(), FakeScreen::default(), FakeOcr::default(), clicker);
        let (ctx, rx) = context();

        tool.iterate(&ctx).unwrap();

        assert_eq!(*actions.borrow(), vec![Action::Click(900, 700, MouseButton::Left)]);
        let messages = updates(&rx);
        assert_eq!(messages.len(), 9);
        assert_eq!(messages[8], "Clicked Restock button");
    }

    #[test]
    fn test_ocr_failure_counts_as_no_text() {
        let clicker = RecordingClicker::default();
        let actions = clicker.log();
        let ocr = FakeOcr::default().then_fail();
        let mut tool = RestockTool::new(&config(), FakeScreen::default(), ocr, clicker);
        let (ctx, _rx) = context();

        assert_eq!(tool.iterate(&ctx).unwrap(), Flow::Continue);
        assert_eq!(*actions.borrow(), vec![Action::Click(900, 700, MouseButton::Left)]);
    }

    #[test]
    fn test_click_failure_is_an_iteration_error() {
        let clicker = RecordingClicker {
            fail_after: Some(0),
            ..RecordingClicker::default()
        };
        let mut tool = RestockTool::new(&config(), FakeScreen::default(), FakeOcr::default(), clicker);
        let (ctx, _rx) = context();

        assert!(matches!(tool.iterate(&ctx), Err(WorkerError::Input(_))));
    }

    #[test]
    fn test_stops_scanning_when_cancelled() {
        let screen = FakeScreen::default();
        let captured = screen.captured.clone();
        let clicker = RecordingClicker::default();
        let actions = clicker.log();
        let mut tool = RestockTool::new(&config(), screen, FakeOcr::default(), clicker);
        let (ctx, _rx) = context();
        ctx.stop_token().cancel();

        tool.iterate(&ctx).unwrap();
        assert!(captured.borrow().is_empty());
        assert!(actions.borrow().is_empty());
    }

    #[test]
    fn test_delays_come_from_config() {
        let tool = RestockTool::new(
            &RestockConfig::default(),
            FakeScreen::default(),
            FakeOcr::default(),
            RecordingClicker::default(),
        );
        assert_eq!(tool.loop_delay(), Duration::from_secs(1));
        assert_eq!(tool.error_backoff(), Duration::from_secs(5));
    }
}
