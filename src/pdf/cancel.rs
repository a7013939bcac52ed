//! Cooperative cancellation for raster jobs
//!
//! The scheduler keeps one clone of the token and hands the other to the
//! worker. Cancelling only asks the raster to stop; whether the result is
//! published is decided by the scheduler's epoch check.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared cancel flag for one raster job
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call any number of times, including
    /// after the job has finished.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_cancel() {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        assert!(!worker_token.is_cancelled());

        token.cancel();
        assert!(worker_token.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
