//! Screen-reading helpers for Diablo IV vendor, enchant and portal chores.
//!
//! Every tool is the same loop: capture a region, read it (OCR or image
//! template), decide with the fuzzy [`matcher`], click.

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod hotkey;
pub mod input;
pub mod launcher;
pub mod logging;
pub mod matcher;
pub mod ocr;
pub mod picker;
pub mod state;
pub mod template;
pub mod theme;
pub mod tools;
pub mod worker;
