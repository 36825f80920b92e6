use std::time::{Duration, Instant};

use thiserror::Error;

/// Where a tool worker is in its life
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RunState {
    #[default]
    Idle,
    Starting,
    Running {
        since: Instant,
    },
    /// Cancelled, waiting for the current iteration to return
    Stopping,
}

impl RunState {
    pub fn is_idle(&self) -> bool {
        matches!(self, RunState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    pub fn uptime(&self) -> Option<Duration> {
        match self {
            RunState::Running { since } => Some(since.elapsed()),
            _ => None,
        }
    }
}

/// Requests that move a worker between states
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    /// Host wants a worker
    Start,
    /// Worker thread exists
    Spawned,
    /// Host wants the worker gone
    Stop,
    /// Worker thread joined
    Joined,
    /// Worker exited on its own or never came up
    Abandon,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Tool is already running")]
    AlreadyRunning,

    #[error("Tool is not running")]
    NotRunning,

    #[error("Tool is busy {0}")]
    Busy(&'static str),
}

/// Guards against a second worker per tool and double joins
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: RunState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn apply(&mut self, step: Step) -> Result<RunState, TransitionError> {
        use RunState::*;

        let next = match (self.state, step) {
            (_, Step::Abandon) => Idle,
            (Idle, Step::Start) => Starting,
            (Starting, Step::Spawned) => Running {
                since: Instant::now(),
            },
            (Running { .. }, Step::Stop) => Stopping,
            (Stopping, Step::Joined) => Idle,

            (Running { .. }, Step::Start) => return Err(TransitionError::AlreadyRunning),
            (Idle, _) => return Err(TransitionError::NotRunning),
            (Starting, _) => return Err(TransitionError::Busy("starting")),
            (Stopping, _) => return Err(TransitionError::Busy("stopping")),
            (Running { .. }, _) => return Err(TransitionError::AlreadyRunning),
        };

        tracing::debug!("Worker state {:?} -> {:?} ({:?})", self.state, next, step);
        self.state = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_cycle() {
        let mut life = Lifecycle::new();
        assert!(life.state().is_idle());

        assert_eq!(life.apply(Step::Start), Ok(RunState::Starting));
        assert!(life.apply(Step::Spawned).unwrap().is_running());
        assert!(life.state().uptime().is_some());
        assert_eq!(life.apply(Step::Stop), Ok(RunState::Stopping));
        assert_eq!(life.apply(Step::Joined), Ok(RunState::Idle));
    }

    #[test]
    fn test_rejected_steps_leave_state_alone() {
        let mut life = Lifecycle::new();
        assert_eq!(life.apply(Step::Stop), Err(TransitionError::NotRunning));

        life.apply(Step::Start).unwrap();
        assert_eq!(life.apply(Step::Start), Err(TransitionError::Busy("starting")));
        assert_eq!(life.state(), RunState::Starting);

        life.apply(Step::Spawned).unwrap();
        assert_eq!(life.apply(Step::Start), Err(TransitionError::AlreadyRunning));
        assert!(life.state().is_running());
    }

    #[test]
    fn test_abandon_from_anywhere() {
        let mut life = Lifecycle::new();
        life.apply(Step::Start).unwrap();
        assert_eq!(life.apply(Step::Abandon), Ok(RunState::Idle));
        assert_eq!(RunState::Idle.uptime(), None);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(TransitionError::Busy("stopping").to_string(), "Tool is busy stopping");
    }
}
