//! # Cancellable Countdown Latch
//!
//! Waits for N completions or the first failure, whichever comes first.

use shared_types::PublishError;
use tokio::sync::watch;

#[derive(Debug, Clone)]
struct LatchState {
    remaining: usize,
    error: Option<PublishError>,
}

/// Countdown latch that a single failure can release early.
pub struct CancellableCountDownLatch {
    state: watch::Sender<LatchState>,
}

impl CancellableCountDownLatch {
    /// Create a latch expecting `count` completions.
    pub fn new(count: usize) -> Self {
        let (state, _) = watch::channel(LatchState {
            remaining: count,
            error: None,
        });
        Self { state }
    }

    /// Record one completion.
    pub fn count_down(&self) {
        self.state.send_modify(|s| s.remaining = s.remaining.saturating_sub(1));
    }

    /// Release every waiter with `error`. Only the first error is kept.
    pub fn cancel(&self, error: PublishError) {
        self.state.send_modify(|s| {
            if s.error.is_none() {
                s.error = Some(error);
            }
        });
    }

    /// Completions still outstanding.
    pub fn remaining(&self) -> usize {
        self.state.borrow().remaining
    }

    /// Whether the latch has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().error.is_some()
    }

    /// Wait until the count reaches zero or the latch is cancelled.
    pub async fn wait(&self) -> Result<(), PublishError> {
        let mut receiver = self.state.subscribe();
        let state = receiver
            .wait_for(|s| s.remaining == 0 || s.error.is_some())
            .await
            .map_err(|_| PublishError::Cancelled)?;

        match &state.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
