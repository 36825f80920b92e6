//! Global stop key.

use std::thread;

use rdev::{listen, Event, EventType, Key};

use crate::worker::StopToken;

/// Key that stops a running tool
pub const STOP_KEY: Key = Key::KeyP;

/// Whether `event` should stop the tool
pub fn is_stop_event(event: &EventType, key: Key) -> bool {
    matches!(event, EventType::KeyPress(pressed) if *pressed == key)
}

/// Cancel `stop` when `key` is pressed anywhere on the desktop.
///
/// `rdev::listen` blocks for the life of the process, so the listener thread
/// is detached and simply outlives the worker.
pub fn spawn_stop_listener(stop: StopToken, key: Key) {
    let spawned = thread::Builder::new()
        .name("stop-key".to_string())
        .spawn(move || {
            if let Err(e) = listen(move |event: Event| {
                if is_stop_event(&event.event_type, key) && !stop.is_cancelled() {
                    tracing::info!("Stop key {:?} pressed", key);
                    stop.cancel();
                }
            }) {
                tracing::error!("Error setting up keyboard listener: {:?}", e);
            }
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to start keyboard listener thread: {}", e);
    }
}
