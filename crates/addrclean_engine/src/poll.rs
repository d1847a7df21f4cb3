use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// The single fixed-interval status poll timer.
///
/// Starting an active timer and stopping an inactive one are both no-ops.
#[derive(Debug, Default)]
pub struct PollTimer {
    cancel: Option<CancellationToken>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Calls `on_tick` every `interval`, first after one full interval.
    /// The timer ends itself once `on_tick` returns false.
    ///
    /// Returns false if a timer was already running.
    pub fn start<F>(&mut self, runtime: &Handle, interval: Duration, on_tick: F) -> bool
    where
        F: Fn() -> bool + Send + 'static,
    {
        if self.is_active() {
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        runtime.spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });
        self.cancel = Some(token);
        true
    }

    /// Returns false if no timer was running.
    pub fn stop(&mut self) -> bool {
        match self.cancel.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
