use std::time::Duration;

use crate::capture::CaptureRegion;
use crate::config::{secs, KurastConfig};
use crate::error::WorkerError;
use crate::input::{Clicker, MouseButton};
use crate::template::TemplateFinder;
use crate::worker::{Flow, Tool, WorkerContext};

/// Pause between arriving at a target and pressing the button
const HOVER: Duration = Duration::from_millis(100);

/// Kurast portal helper.
///
/// Polls the scan region for the portal image. Once it shows up: click it,
/// right-click the tribute spot, click the portal button (the last two only
/// when configured), then finish.
pub struct KurastTool<F, C> {
    finder: F,
    clicker: C,
    scan_region: CaptureRegion,
    confidence: f32,
    tribute_spot: Option<(i32, i32)>,
    portal_button: Option<(i32, i32)>,
    click_delay: Duration,
    move_duration: Duration,
    loop_delay: Duration,
    error_backoff: Duration,
}

impl<F: TemplateFinder, C: Clicker> KurastTool<F, C> {
    pub fn new(config: &KurastConfig, finder: F, clicker: C) -> Self {
        Self {
            finder,
            clicker,
            scan_region: CaptureRegion::from_array(config.scan_region),
            confidence: config.confidence,
            tribute_spot: config.tribute_spot(),
            portal_button: config.portal_button(),
            click_delay: secs(config.click_delay),
            move_duration: secs(config.move_duration),
            loop_delay: secs(config.loop_delay),
            error_backoff: secs(config.error_backoff),
        }
    }

    /// Glide to the target, hover briefly, click
    fn visit(
        &mut self,
        ctx: &WorkerContext,
        (x, y): (i32, i32),
        button: MouseButton,
    ) -> Result<bool, WorkerError> {
        self.clicker.move_to(x, y, self.move_duration)?;
        if !ctx.sleep(HOVER) {
            return Ok(false);
        }
        self.clicker.click(x, y, button)?;
        Ok(ctx.sleep(self.click_delay))
    }
}

impl<F: TemplateFinder, C: Clicker> Tool for KurastTool<F, C> {
    fn name(&self) -> &'static str {
        "kurast"
    }

    fn iterate(&mut self, ctx: &WorkerContext) -> Result<Flow, WorkerError> {
        let Some(target) = self.finder.find(self.scan_region, self.confidence)? else {
            ctx.update("Portal target not found");
            return Ok(Flow::Continue);
        };

        if !self.visit(ctx, target, MouseButton::Left)? {
            return Ok(Flow::Continue);
        }

        if let Some(spot) = self.tribute_spot {
            ctx.update(format!("Moving to tribute spot ({}, {})", spot.0, spot.1));
            if !self.visit(ctx, spot, MouseButton::Right)? {
                return Ok(Flow::Continue);
            }
        }

        if let Some(button) = self.portal_button {
            if !self.visit(ctx, button, MouseButton::Left)? {
                return Ok(Flow::Continue);
            }
        }

        ctx.update("Completed portal sequence");
        Ok(Flow::Finished)
    }

    fn loop_delay(&self) -> Duration {
        self.loop_delay
    }

    fn error_backoff(&self) -> Duration {
        self.error_backoff
    }
}
