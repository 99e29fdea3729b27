use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error returned when a task observes cancellation at a checkpoint.
///
/// Pipeline stages propagate it with `?` to unwind to the caller at the
/// next checkpoint. It carries no payload: cancellation discards all
/// work for the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("task cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Token that signals cancellation to cooperative tasks.
///
/// Cloning a token creates another handle to the same cancellation flag.
/// Calling [`cancel()`](CancellationToken::cancel) on any clone affects all.
#[derive(Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token (not cancelled).
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Returns whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
