//! Polling worker
//!
//! Every tool follows the same shape: do one iteration (capture, recognize,
//! click), sleep, repeat until told to stop or until the tool reports that
//! its job is done. Errors are logged, reported, and followed by a back-off
//! before the next attempt.
//!
//! ```text
//! host thread                      worker thread
//! ───────────                      ─────────────
//! ToolRunner::start ──spawn──────> build tool
//!                                  loop {
//!   rx.recv() <──WorkerEvent────     tool.iterate(ctx)
//!                                    ctx.sleep(loop_delay)
//! StopToken::cancel ─────────────>   (sleep returns early)
//!                                  }
//! ToolRunner::stop ──join────────> WorkerOutcome
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::{Condvar, Mutex};

use crate::error::WorkerError;
use crate::state::{Lifecycle, RunState, Step, TransitionError};

/// Cooperative cancellation flag shared between a worker and its host
#[derive(Clone, Default)]
pub struct StopToken {
    inner: Arc<StopInner>,
}

#[derive(Default)]
struct StopInner {
    stopped: Mutex<bool>,
    signal: Condvar,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let mut stopped = self.inner.stopped.lock();
        *stopped = true;
        self.inner.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.stopped.lock()
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` on cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut stopped = self.inner.stopped.lock();
        while !*stopped {
            if self.inner.signal.wait_until(&mut stopped, deadline).timed_out() {
                return !*stopped;
            }
        }
        false
    }
}

/// Progress reported by a worker to its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Update(String),
    Error(String),
    /// The tool completed its job and stopped on its own
    Finished,
    /// The worker observed cancellation and exited
    Stopped,
}

/// How a worker thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Finished,
    Cancelled,
    /// The tool could not be constructed
    Failed(String),
}

/// What the loop should do after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Handle passed to each iteration
pub struct WorkerContext {
    stop: StopToken,
    events: Sender<WorkerEvent>,
}

impl WorkerContext {
    pub fn new(stop: StopToken, events: Sender<WorkerEvent>) -> Self {
        Self { stop, events }
    }

    /// Report progress to the host
    pub fn update(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        // Host may have gone away; the worker keeps going until cancelled
        let _ = self.events.send(WorkerEvent::Update(message));
    }

    fn send(&self, event: WorkerEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Cancellable sleep; `false` means stop was requested
    pub fn sleep(&self, duration: Duration) -> bool {
        self.stop.sleep(duration)
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }
}

/// One automated task
pub trait Tool {
    /// Name used for thread names and logs
    fn name(&self) -> &'static str;

    /// Run a single polling iteration
    fn iterate(&mut self, ctx: &WorkerContext) -> Result<Flow, WorkerError>;

    /// Pause between successful iterations
    fn loop_delay(&self) -> Duration;

    /// Pause after a failed iteration
    fn error_backoff(&self) -> Duration;
}

/// Drive `tool` until it finishes or `ctx` is cancelled
pub fn run_loop<T: Tool + ?Sized>(tool: &mut T, ctx: &WorkerContext) -> WorkerOutcome {
    tracing::info!("{} started", tool.name());

    while !ctx.is_stopped() {
        match tool.iterate(ctx) {
            Ok(Flow::Finished) => {
                tracing::info!("{} finished", tool.name());
                ctx.send(WorkerEvent::Finished);
                return WorkerOutcome::Finished;
            }
            Ok(Flow::Continue) => {
                ctx.sleep(tool.loop_delay());
            }
            Err(e) => {
                tracing::error!("Error in {}: {}", tool.name(), e);
                ctx.send(WorkerEvent::Error(format!("Error occurred: {}", e)));
                ctx.sleep(tool.error_backoff());
            }
        }
    }

    tracing::info!("{} stopped", tool.name());
    ctx.send(WorkerEvent::Stopped);
    WorkerOutcome::Cancelled
}

/// A worker thread and the token that stops it
pub struct WorkerHandle {
    stop: StopToken,
    thread: JoinHandle<WorkerOutcome>,
}

impl WorkerHandle {
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> Result<WorkerOutcome, WorkerError> {
        self.thread.join().map_err(|_| WorkerError::Panicked)
    }
}

/// Spawn a worker thread.
///
/// The tool is built on the worker thread itself so that collaborators
/// holding thread-bound resources (OCR engines) never cross threads.
pub fn spawn<F, T>(
    name: &str,
    build: F,
    events: Sender<WorkerEvent>,
) -> Result<WorkerHandle, WorkerError>
where
    F: FnOnce() -> Result<T, WorkerError> + Send + 'static,
    T: Tool + 'static,
{
    let stop = StopToken::new();
    let ctx = WorkerContext::new(stop.clone(), events);

    let thread = thread::Builder::new()
        .name(format!("{}-worker", name))
        .spawn(move || match build() {
            Ok(mut tool) => run_loop(&mut tool, &ctx),
            Err(e) => {
                tracing::error!("Failed to initialize tool: {}", e);
                ctx.send(WorkerEvent::Error(format!("Failed to initialize: {}", e)));
                ctx.send(WorkerEvent::Stopped);
                WorkerOutcome::Failed(e.to_string())
            }
        })
        .map_err(WorkerError::ThreadSpawnFailed)?;

    Ok(WorkerHandle { stop, thread })
}

/// At most one worker at a time, with lifecycle checks
#[derive(Default)]
pub struct ToolRunner {
    lifecycle: Lifecycle,
    handle: Option<WorkerHandle>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.lifecycle.state()
    }

    pub fn start<F, T>(
        &mut self,
        name: &str,
        build: F,
        events: Sender<WorkerEvent>,
    ) -> Result<(), WorkerError>
    where
        F: FnOnce() -> Result<T, WorkerError> + Send + 'static,
        T: Tool + 'static,
    {
        self.reap()?;
        self.lifecycle.apply(Step::Start)?;

        match spawn(name, build, events) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.lifecycle.apply(Step::Spawned)?;
                Ok(())
            }
            Err(e) => {
                self.lifecycle.apply(Step::Abandon)?;
                Err(e)
            }
        }
    }

    pub fn stop_token(&self) -> Option<StopToken> {
        self.handle.as_ref().map(WorkerHandle::stop_token)
    }

    /// Request cancellation and wait for the worker to exit
    pub fn stop(&mut self) -> Result<WorkerOutcome, WorkerError> {
        self.lifecycle.apply(Step::Stop)?;
        let handle = self
            .handle
            .take()
            .ok_or(WorkerError::Transition(TransitionError::NotRunning))?;

        handle.stop.cancel();
        let outcome = handle.join();
        self.lifecycle.apply(Step::Joined)?;
        outcome
    }

    /// Collect a worker that exited on its own
    pub fn reap(&mut self) -> Result<Option<WorkerOutcome>, WorkerError> {
        match &self.handle {
            Some(handle) if handle.is_finished() => {}
            _ => return Ok(None),
        }

        let outcome = self.handle.take().map(WorkerHandle::join).transpose();
        self.lifecycle.apply(Step::Abandon)?;
        outcome
    }
}
