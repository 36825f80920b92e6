//! Worker lifecycle tracking.

pub mod lifecycle;

pub use lifecycle::{Lifecycle, RunState, Step, TransitionError};
