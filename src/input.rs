//! Synthetic mouse input.

use std::thread;
use std::time::Duration;

use rdev::{simulate, Button, EventType};

use crate::error::InputError;

/// Mouse button to press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    fn action(self) -> &'static str {
        match self {
            MouseButton::Left => "left click",
            MouseButton::Right => "right click",
        }
    }
}

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        }
    }
}

/// Something that can move the pointer and click
pub trait Clicker {
    /// Move the pointer to (x, y), gliding over `duration`
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), InputError>;

    /// Jump to (x, y) and click there
    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError>;
}

/// OS-level input through `rdev`
///
/// Some platforms drop events that arrive back to back, so every simulated
/// event is followed by a short settle delay.
pub struct RdevClicker {
    settle: Duration,
    last_position: Option<(i32, i32)>,
}

impl RdevClicker {
    const GLIDE_STEP: Duration = Duration::from_millis(10);

    pub fn new() -> Self {
        Self {
            settle: Duration::from_millis(20),
            last_position: None,
        }
    }

    fn send(&self, event: EventType, action: &'static str, x: i32, y: i32) -> Result<(), InputError> {
        simulate(&event).map_err(|_| InputError::SimulateFailed { action, x, y })?;
        thread::sleep(self.settle);
        Ok(())
    }

    fn jump(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.send(
            EventType::MouseMove {
                x: x as f64,
                y: y as f64,
            },
            "pointer move",
            x,
            y,
        )?;
        self.last_position = Some((x, y));
        Ok(())
    }
}

impl Default for RdevClicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Clicker for RdevClicker {
    fn move_to(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), InputError> {
        // Without a known start point there is nothing to glide from
        let Some(from) = self.last_position else {
            return self.jump(x, y);
        };

        for (px, py) in glide_path(from, (x, y), duration, Self::GLIDE_STEP) {
            simulate(&EventType::MouseMove {
                x: px as f64,
                y: py as f64,
            })
            .map_err(|_| InputError::SimulateFailed {
                action: "pointer move",
                x: px,
                y: py,
            })?;
            thread::sleep(Self::GLIDE_STEP);
        }
        self.jump(x, y)
    }

    fn click(&mut self, x: i32, y: i32, button: MouseButton) -> Result<(), InputError> {
        self.jump(x, y)?;
        self.send(EventType::ButtonPress(button.into()), button.action(), x, y)?;
        self.send(EventType::ButtonRelease(button.into()), button.action(), x, y)?;
        tracing::debug!("{} at ({}, {})", button.action(), x, y);
        Ok(())
    }
}

/// Intermediate pointer positions between `from` and `to`, excluding `to`
fn glide_path(from: (i32, i32), to: (i32, i32), duration: Duration, step: Duration) -> Vec<(i32, i32)> {
    let steps = (duration.as_millis() / step.as_millis().max(1)) as i32;
    (1..steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (
                from.0 + ((to.0 - from.0) as f64 * t).round() as i32,
                from.1 + ((to.1 - from.1) as f64 * t).round() as i32,
            )
        })
        .collect()
}
