//! Progress reporting over a bounded channel.
//!
//! The worker reports coarse progress as `(percent, message)` pairs through
//! a bounded channel to the caller's context. The sender enforces the two
//! ordering guarantees downstream consumers rely on: percent values are
//! monotonically non-decreasing, and the terminal `(100, "Complete")`
//! notification is emitted exactly once per run.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

/// Message used to signal run completion.
pub const COMPLETE_MESSAGE: &str = "Complete";

/// One progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Progress percentage, 0.0..=100.0, non-decreasing within a run.
    pub percent: f32,
    /// Human-readable stage description.
    pub message: String,
}

/// Sending half of the progress channel.
///
/// Clamps every reported percent to the highest value seen so far and
/// latches after the terminal notification, so a misbehaving stage cannot
/// violate the ordering contract.
pub struct ProgressSender {
    tx: SyncSender<ProgressUpdate>,
    last_percent: f32,
    completed: bool,
}

/// Creates a bounded progress channel with room for `capacity` in-flight
/// updates.
#[must_use]
pub fn progress_channel(capacity: usize) -> (ProgressSender, Receiver<ProgressUpdate>) {
    let (tx, rx) = sync_channel(capacity);
    (
        ProgressSender {
            tx,
            last_percent: 0.0,
            completed: false,
        },
        rx,
    )
}

impl ProgressSender {
    /// Reports a progress update. Values below the previous report are
    /// raised to it; values above 100 are capped. Updates after completion
    /// are dropped.
    pub fn report(&mut self, percent: f32, message: impl Into<String>) {
        if self.completed {
            return;
        }
        let percent = percent.max(self.last_percent).min(100.0);
        self.last_percent = percent;
        // A dropped receiver disconnects the channel; progress then becomes
        // a no-op rather than an error for the run.
        if self
            .tx
            .send(ProgressUpdate {
                percent,
                message: message.into(),
            })
            .is_err()
        {
            log::debug!("progress receiver dropped, further updates discarded");
        }
    }

    /// Emits the terminal `(100, "Complete")` notification. Subsequent
    /// calls (and any later `report`) are ignored.
    pub fn complete(&mut self) {
        if self.completed {
            return;
        }
        self.report(100.0, COMPLETE_MESSAGE);
        self.completed = true;
    }
}
