//! Set positions and regions in a tool config by clicking on the desktop.
//!
//! A position is the cursor at the next left click. A region is either a
//! left-button drag or two clicks on opposite corners. Escape cancels.

use std::fmt;
use std::thread;

use crossbeam_channel::bounded;
use rdev::{listen, Button, Event, EventType, Key};
use serde_json::Value;

use crate::config::ToolConfig;
use crate::error::{ConfigError, PickError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickShape {
    /// `[x, y]`
    Point,
    /// `[x, y, width, height]`
    Region,
}

impl PickShape {
    pub fn name(&self) -> &'static str {
        match self {
            PickShape::Point => "position",
            PickShape::Region => "region",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picked {
    Point([i32; 2]),
    Region([u32; 4]),
}

impl Picked {
    pub fn shape(&self) -> PickShape {
        match self {
            Picked::Point(_) => PickShape::Point,
            Picked::Region(_) => PickShape::Region,
        }
    }

    fn to_value(self) -> Value {
        match self {
            Picked::Point(point) => Value::from(point.to_vec()),
            Picked::Region(region) => Value::from(region.to_vec()),
        }
    }
}

impl fmt::Display for Picked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Picked::Point(point) => write!(f, "{:?}", point),
            Picked::Region(region) => write!(f, "{:?}", region),
        }
    }
}

/// Result of feeding one input event to a [`PickRecorder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Pending,
    Done(Picked),
    Cancelled,
}

/// Turns raw desktop input events into a picked position or region.
///
/// Button events carry no coordinates, so the last mouse move is tracked.
#[derive(Debug)]
pub struct PickRecorder {
    shape: PickShape,
    cursor: (f64, f64),
    anchor: Option<(i32, i32)>,
    /// The anchor click was released in place; the next press closes the region
    clicked: bool,
    finished: bool,
}

impl PickRecorder {
    pub fn new(shape: PickShape) -> Self {
        Self {
            shape,
            cursor: (0.0, 0.0),
            anchor: None,
            clicked: false,
            finished: false,
        }
    }

    pub fn feed(&mut self, event: &EventType) -> Feed {
        if self.finished {
            return Feed::Pending;
        }

        let feed = match *event {
            EventType::MouseMove { x, y } => {
                self.cursor = (x, y);
                Feed::Pending
            }
            EventType::KeyPress(Key::Escape) => Feed::Cancelled,
            EventType::ButtonPress(Button::Left) => self.press(),
            EventType::ButtonRelease(Button::Left) => self.release(),
            _ => Feed::Pending,
        };

        if feed != Feed::Pending {
            self.finished = true;
        }
        feed
    }

    fn position(&self) -> (i32, i32) {
        (self.cursor.0.round() as i32, self.cursor.1.round() as i32)
    }

    fn press(&mut self) -> Feed {
        let here = self.position();
        match (self.shape, self.anchor) {
            (PickShape::Point, _) => Feed::Done(Picked::Point([here.0, here.1])),
            (PickShape::Region, None) => {
                self.anchor = Some(here);
                Feed::Pending
            }
            (PickShape::Region, Some(start)) if self.clicked => {
                Feed::Done(Picked::Region(region_between(start, here)))
            }
            (PickShape::Region, Some(_)) => Feed::Pending,
        }
    }

    fn release(&mut self) -> Feed {
        let here = self.position();
        match self.anchor {
            Some(start) if !self.clicked && start != here => {
                Feed::Done(Picked::Region(region_between(start, here)))
            }
            Some(_) => {
                self.clicked = true;
                Feed::Pending
            }
            None => Feed::Pending,
        }
    }
}

/// `[x, y, width, height]` spanned by two corners, clipped to the positive quadrant
fn region_between(a: (i32, i32), b: (i32, i32)) -> [u32; 4] {
    let (left, right) = (a.0.min(b.0).max(0), a.0.max(b.0).max(0));
    let (top, bottom) = (a.1.min(b.1).max(0), a.1.max(b.1).max(0));
    [
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ]
}

/// Block until the user picks a `shape` on screen
pub fn pick(shape: PickShape) -> Result<Picked, PickError> {
    let (tx, rx) = bounded(1);
    let events = tx.clone();

    // rdev::listen never returns on success; the thread dies with the process
    thread::Builder::new()
        .name("picker".to_string())
        .spawn(move || {
            let mut recorder = PickRecorder::new(shape);
            let result = listen(move |event: Event| match recorder.feed(&event.event_type) {
                Feed::Pending => {}
                Feed::Done(picked) => {
                    let _ = events.try_send(Ok(picked));
                }
                Feed::Cancelled => {
                    let _ = events.try_send(Err(PickError::Cancelled));
                }
            });
            if let Err(e) = result {
                let _ = tx.send(Err(PickError::ListenFailed(format!("{:?}", e))));
            }
        })
        .map_err(|e| PickError::ListenFailed(e.to_string()))?;

    let picked = rx
        .recv()
        .map_err(|e| PickError::ListenFailed(e.to_string()))??;
    tracing::info!("Picked {}", picked);
    Ok(picked)
}

/// A position or region inside a tool config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickTarget {
    pub field: String,
    /// 1-based entry of a list field
    pub index: Option<usize>,
    pub shape: PickShape,
}

impl fmt::Display for PickTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{} #{}", self.field, index),
            None => write!(f, "{}", self.field),
        }
    }
}

fn shape_of(value: &Value) -> Option<PickShape> {
    let items = value.as_array()?;
    if !items.iter().all(Value::is_number) {
        return None;
    }
    match items.len() {
        2 => Some(PickShape::Point),
        4 => Some(PickShape::Region),
        _ => None,
    }
}

fn to_raw<C: ToolConfig>(config: &C) -> Result<Value, PickError> {
    serde_json::to_value(config).map_err(|e| ConfigError::Invalid(e.to_string()).into())
}

/// Resolve `field` (and `index` for list fields) against the keys of `config`
pub fn target<C: ToolConfig>(
    config: &C,
    field: &str,
    index: Option<usize>,
) -> Result<PickTarget, PickError> {
    let raw = to_raw(config)?;
    let value = raw
        .get(field)
        .ok_or_else(|| PickError::UnknownField(field.to_string()))?;
    let not_pickable = || PickError::NotPickable(field.to_string());

    let shape = match (shape_of(value), index) {
        (Some(shape), None) => shape,
        (Some(_), Some(_)) => return Err(PickError::UnexpectedIndex(field.to_string())),
        (None, index) => {
            let entries = value.as_array().ok_or_else(not_pickable)?;
            let len = entries.len();
            if len == 0 || !entries.iter().all(|entry| shape_of(entry).is_some()) {
                return Err(not_pickable());
            }
            let index = index.ok_or_else(|| PickError::NeedsIndex {
                field: field.to_string(),
                len,
            })?;
            index
                .checked_sub(1)
                .and_then(|i| entries.get(i))
                .and_then(shape_of)
                .ok_or_else(|| PickError::IndexOutOfRange {
                    field: field.to_string(),
                    index,
                    len,
                })?
        }
    };

    Ok(PickTarget {
        field: field.to_string(),
        index,
        shape,
    })
}

/// Copy of `config` with `picked` written at `target`
pub fn apply<C: ToolConfig>(config: &C, target: &PickTarget, picked: Picked) -> Result<C, PickError> {
    if picked.shape() != target.shape {
        return Err(PickError::ShapeMismatch {
            field: target.to_string(),
            expected: target.shape.name(),
        });
    }

    let mut raw = to_raw(config)?;
    let mut slot = raw
        .get_mut(&target.field)
        .ok_or_else(|| PickError::UnknownField(target.field.clone()))?;
    if let Some(index) = target.index {
        slot = slot
            .get_mut(index.saturating_sub(1))
            .ok_or_else(|| PickError::UnknownField(target.to_string()))?;
    }
    *slot = picked.to_value();

    serde_json::from_value(raw).map_err(|e| ConfigError::Invalid(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnchantConfig, KurastConfig, RestockConfig};

    fn moved(x: f64, y: f64) -> EventType {
        EventType::MouseMove { x, y }
    }

    fn run(shape: PickShape, events: &[EventType]) -> Feed {
        let mut recorder = PickRecorder::new(shape);
        let mut last = Feed::Pending;
        for event in events {
            last = recorder.feed(event);
            if last != Feed::Pending {
                break;
            }
        }
        last
    }

    const PRESS: EventType = EventType::ButtonPress(Button::Left);
    const RELEASE: EventType = EventType::ButtonRelease(Button::Left);

    #[test]
    fn test_point_is_cursor_at_left_press() {
        let feed = run(
            PickShape::Point,
            &[
                moved(10.4, 20.6),
                EventType::ButtonPress(Button::Right),
                moved(640.2, 360.0),
                PRESS,
            ],
        );
        assert_eq!(feed, Feed::Done(Picked::Point([640, 360])));
    }

    #[test]
    fn test_region_by_drag() {
        let feed = run(
            PickShape::Region,
            &[moved(300.0, 200.0), PRESS, moved(100.0, 150.0), RELEASE],
        );
        assert_eq!(feed, Feed::Done(Picked::Region([100, 150, 200, 50])));
    }

    #[test]
    fn test_region_by_two_clicks() {
        let feed = run(
            PickShape::Region,
            &[moved(10.0, 10.0), PRESS, RELEASE, moved(50.0, 40.0), PRESS],
        );
        assert_eq!(feed, Feed::Done(Picked::Region([10, 10, 40, 30])));
    }

    #[test]
    fn test_region_clips_negative_coordinates() {
        let feed = run(
            PickShape::Region,
            &[moved(-20.0, 5.0), PRESS, moved(30.0, 25.0), RELEASE],
        );
        assert_eq!(feed, Feed::Done(Picked::Region([0, 5, 30, 20])));
    }

    #[test]
    fn test_escape_cancels_and_recorder_stays_finished() {
        let mut recorder = PickRecorder::new(PickShape::Region);
        recorder.feed(&moved(5.0, 5.0));
        recorder.feed(&PRESS);
        assert_eq!(recorder.feed(&EventType::KeyPress(Key::Escape)), Feed::Cancelled);
        assert_eq!(recorder.feed(&RELEASE), Feed::Pending);
    }

    #[test]
    fn test_targets_resolve_from_config_keys() {
        let restock = RestockConfig::default();
        assert_eq!(
            target(&restock, "restock_button", None).unwrap().shape,
            PickShape::Point
        );
        let slot = target(&restock, "scan_regions", Some(3)).unwrap();
        assert_eq!(slot.shape, PickShape::Region);
        assert_eq!(slot.to_string(), "scan_regions #3");

        let enchant = EnchantConfig::default();
        assert_eq!(
            target(&enchant, "scan_buttons", Some(2)).unwrap().shape,
            PickShape::Point
        );
        assert_eq!(
            target(&KurastConfig::default(), "scan_region", None).unwrap().shape,
            PickShape::Region
        );
    }

    #[test]
    fn test_target_errors() {
        let config = RestockConfig::default();
        assert!(matches!(
            target(&config, "nope", None),
            Err(PickError::UnknownField(_))
        ));
        assert!(matches!(
            target(&config, "target_words", Some(1)),
            Err(PickError::NotPickable(_))
        ));
        assert!(matches!(
            target(&config, "click_delay", None),
            Err(PickError::NotPickable(_))
        ));
        assert!(matches!(
            target(&config, "scan_regions", None),
            Err(PickError::NeedsIndex { len: 8, .. })
        ));
        assert!(matches!(
            target(&config, "scan_regions", Some(9)),
            Err(PickError::IndexOutOfRange { index: 9, len: 8, .. })
        ));
        assert!(matches!(
            target(&config, "restock_button", Some(1)),
            Err(PickError::UnexpectedIndex(_))
        ));
    }

    #[test]
    fn test_apply_writes_only_the_target_entry() {
        let mut config = RestockConfig::default();
        config.ocr.ocr_threshold = 140;

        let slot = target(&config, "scan_regions", Some(3)).unwrap();
        let updated = apply(&config, &slot, Picked::Region([1, 2, 3, 4])).unwrap();
        assert_eq!(updated.scan_regions[2], [1, 2, 3, 4]);
        assert_eq!(updated.scan_regions[0], [0, 0, 0, 0]);
        assert_eq!(updated.ocr.ocr_threshold, 140);

        let button = target(&updated, "restock_button", None).unwrap();
        let updated = apply(&updated, &button, Picked::Point([900, 700])).unwrap();
        assert_eq!(updated.restock_button, [900, 700]);
        assert_eq!(updated.scan_regions[2], [1, 2, 3, 4]);
    }

    #[test]
    fn test_apply_rejects_wrong_shape() {
        let config = KurastConfig::default();
        let region = target(&config, "scan_region", None).unwrap();
        let err = apply(&config, &region, Picked::Point([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "'scan_region' needs a region");
    }

    #[test]
    fn test_picked_value_is_written_back_to_disk() {
        let path = std::env::temp_dir()
            .join(format!("d4_assistant_pick_{}", std::process::id()))
            .join(KurastConfig::FILE_NAME);
        let config = KurastConfig::load_from(&path).unwrap();

        let spot = target(&config, "tribute_spot", None).unwrap();
        let updated = apply(&config, &spot, Picked::Point([512, 384])).unwrap();
        updated.save_to(&path).unwrap();

        let reloaded = KurastConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.tribute_spot(), Some((512, 384)));
        assert_eq!(reloaded, updated);

        let _ = std::fs::remove_file(&path);
    }
}
