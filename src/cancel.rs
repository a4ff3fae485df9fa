//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is created per orchestration run and handed to
//! every stage; stages check it at loop boundaries (frame loop, audio
//! streaming loop, drain loops). Setting it guarantees the run terminates
//! in bounded time with [`CoreError::Cancelled`] and no stray temporary
//! files.

use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A settable flag checked cooperatively by the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from any thread, any number of
    /// times.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(CoreError::Cancelled)` once cancellation has been
    /// observed. Stages call this at every loop iteration boundary.
    pub fn check(&self) -> CoreResult<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
