//! Shared coordination signals for one call run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The two cross-stage flags of a pipeline run.
///
/// `should_listen` gates whether captured frames reach the voice-activity
/// detector; it is set by the bridge on stream start, cleared by the VAD
/// stage when an utterance is handed downstream, and set again by the TTS
/// stage once playback frames are queued.
///
/// `stop` is terminal: it transitions 0→1 at most once and is never reset.
/// There is deliberately no method to clear it.
///
/// One instance is created per call run, so concurrent calls never interfere.
#[derive(Debug, Default)]
pub struct PipelineSignals {
    should_listen: AtomicBool,
    stop: AtomicBool,
}

impl PipelineSignals {
    /// Creates a fresh signal pair with both flags unset.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets or clears the listening gate.
    pub fn set_should_listen(&self, listening: bool) {
        self.should_listen.store(listening, Ordering::SeqCst);
    }

    /// Returns whether captured audio should reach the pipeline.
    pub fn should_listen(&self) -> bool {
        self.should_listen.load(Ordering::SeqCst)
    }

    /// Requests a pipeline-wide stop. Idempotent; returns whether this call
    /// was the transition.
    pub fn request_stop(&self) -> bool {
        !self.stop.swap(true, Ordering::SeqCst)
    }

    /// Returns whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fresh_signals_are_unset() {
        let signals = PipelineSignals::new();
        assert!(!signals.should_listen());
        assert!(!signals.stop_requested());
    }

    #[test]
    fn test_should_listen_toggles() {
        let signals = PipelineSignals::new();
        signals.set_should_listen(true);
        assert!(signals.should_listen());
        signals.set_should_listen(false);
        assert!(!signals.should_listen());
    }

    #[test]
    fn test_stop_is_monotonic() {
        let signals = PipelineSignals::new();
        assert!(signals.request_stop());
        assert!(signals.stop_requested());
        // Second request is a no-op transition.
        assert!(!signals.request_stop());
        assert!(signals.stop_requested());
    }

    #[test]
    fn test_flags_are_independent() {
        let signals = PipelineSignals::new();
        signals.set_should_listen(true);
        signals.request_stop();
        assert!(signals.should_listen());
        signals.set_should_listen(false);
        assert!(signals.stop_requested());
    }

    #[test]
    fn test_stop_transition_observed_exactly_once_across_threads() {
        let signals = PipelineSignals::new();
        let transitions: usize = thread::scope(|s| {
            (0..8)
                .map(|_| {
                    let signals = signals.clone();
                    s.spawn(move || signals.request_stop() as usize)
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .sum()
        });
        assert_eq!(transitions, 1);
    }
}
