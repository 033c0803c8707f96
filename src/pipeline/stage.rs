//! Core stage abstraction and runner.
//!
//! Each stage runs in its own thread, blocking on its input queue with a
//! short timeout so the shared stop signal is observed at least once per
//! second even when the queue stays empty. A stage that stops drops its
//! output sender, which wakes its downstream consumer immediately.

use crate::defaults;
use crate::pipeline::signals::PipelineSignals;
use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Errors that can occur during stage processing.
#[derive(Debug, Clone)]
pub enum StageError {
    /// Recoverable error; the stage logs it and keeps running.
    Recoverable(String),
    /// Fatal error; the stage shuts down. Other stages keep running.
    Fatal(String),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Recoverable(msg) => write!(f, "Recoverable error: {}", msg),
            StageError::Fatal(msg) => write!(f, "Fatal error: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}

/// Lifecycle of a running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StageState {
    /// Spawned but not yet processing.
    Init = 0,
    /// Processing inputs.
    Running = 1,
    /// Flushing buffered partial output before exit.
    Draining = 2,
    /// Exited.
    Stopped = 3,
}

impl StageState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => StageState::Init,
            1 => StageState::Running,
            2 => StageState::Draining,
            _ => StageState::Stopped,
        }
    }
}

/// A processing stage in the pipeline.
///
/// Stages receive one input at a time and may emit zero or more outputs for
/// it (synthesis fans one sentence out into many playback frames).
pub trait Stage: Send + 'static {
    /// The input type this stage receives.
    type Input: Send + 'static;
    /// The output type this stage produces.
    type Output: Send + 'static;

    /// Returns the name of this stage for logging.
    fn name(&self) -> &'static str;

    /// Processes a single input item.
    fn process(&mut self, input: Self::Input) -> Result<Vec<Self::Output>, StageError>;

    /// Flushes buffered partial output during shutdown.
    fn drain(&mut self) -> Vec<Self::Output> {
        Vec::new()
    }
}

/// Runs a stage in a dedicated thread.
pub struct StageRunner {
    handle: Option<JoinHandle<()>>,
    name: &'static str,
    state: Arc<AtomicU8>,
}

impl StageRunner {
    /// Spawns a stage thread wired to the given queues and signals.
    pub fn spawn<S: Stage>(
        stage: S,
        input: Receiver<S::Input>,
        output: Sender<S::Output>,
        signals: Arc<PipelineSignals>,
    ) -> Self {
        let name = stage.name();
        let state = Arc::new(AtomicU8::new(StageState::Init as u8));
        let thread_state = state.clone();

        let handle = thread::spawn(move || {
            run_stage(stage, input, output, signals, thread_state);
        });

        Self {
            handle: Some(handle),
            name,
            state,
        }
    }

    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the stage's current lifecycle state.
    pub fn state(&self) -> StageState {
        StageState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Returns true if the stage thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Waits for the stage thread to complete.
    pub fn join(mut self) -> Result<(), String> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| format!("Stage '{}' thread panicked", self.name)),
            None => Ok(()),
        }
    }

    /// Detaches the stage thread; it dies with the process.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

fn run_stage<S: Stage>(
    mut stage: S,
    input: Receiver<S::Input>,
    output: Sender<S::Output>,
    signals: Arc<PipelineSignals>,
    state: Arc<AtomicU8>,
) {
    let name = stage.name();
    let poll = Duration::from_millis(defaults::STAGE_POLL_MS);
    state.store(StageState::Running as u8, Ordering::SeqCst);

    'running: loop {
        if signals.stop_requested() {
            break;
        }

        match input.recv_timeout(poll) {
            Ok(item) => match stage.process(item) {
                Ok(outputs) => {
                    for out in outputs {
                        if !send_polling_stop(&output, out, &signals) {
                            break 'running;
                        }
                    }
                }
                Err(StageError::Recoverable(msg)) => {
                    tracing::warn!(stage = name, error = %msg, "stage error, continuing");
                }
                Err(StageError::Fatal(msg)) => {
                    tracing::error!(stage = name, error = %msg, "stage failed, stopping");
                    break;
                }
            },
            Err(RecvTimeoutError::Timeout) => continue,
            // Upstream dropped its sender: the end-of-stream sentinel.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    state.store(StageState::Draining as u8, Ordering::SeqCst);
    for out in stage.drain() {
        // Bounded attempt only; a stalled consumer must not wedge shutdown.
        if output.send_timeout(out, poll).is_err() {
            tracing::debug!(stage = name, "drain output dropped during shutdown");
            break;
        }
    }

    state.store(StageState::Stopped as u8, Ordering::SeqCst);
    tracing::debug!(stage = name, "stage stopped");
    // `output` is dropped here, waking the downstream consumer.
}

/// Sends one item, re-checking the stop signal while the queue is full.
/// Returns false when the stage should exit instead.
fn send_polling_stop<T>(output: &Sender<T>, item: T, signals: &PipelineSignals) -> bool {
    let poll = Duration::from_millis(defaults::STAGE_POLL_MS);
    let mut item = item;
    loop {
        match output.send_timeout(item, poll) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if signals.stop_requested() {
                    return false;
                }
                item = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
