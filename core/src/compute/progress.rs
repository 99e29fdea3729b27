use super::cancellation::{CancellationToken, Cancelled};

/// Cancellation query and progress reporting for long-running work.
///
/// Pipeline stages poll [`is_cancelled`](Self::is_cancelled) at stage
/// boundaries (never inside tight per-vertex loops) and report coarse
/// `(current, total, label)` progress as stages advance. Both calls are
/// non-blocking; implementations must tolerate calls from multiple
/// worker threads at once.
pub trait ProgressTracker: Sync {
    /// Returns whether the current operation has been cancelled.
    fn is_cancelled(&self) -> bool;

    /// Reports coarse progress. `current` is in `0..=total`.
    fn report(&self, current: u32, total: u32, label: &str);

    /// Checkpoint helper: `Err(Cancelled)` once cancellation is observed.
    ///
    /// Intended for use with `?` in stage functions.
    fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Tracker that never cancels and discards progress reports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressTracker for NullProgress {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report(&self, _current: u32, _total: u32, _label: &str) {}
}

/// Tracker backed by a [`CancellationToken`], logging progress at debug level.
#[derive(Clone)]
pub struct TokenProgress {
    token: CancellationToken,
}

impl TokenProgress {
    /// Creates a tracker observing the given token.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl ProgressTracker for TokenProgress {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn report(&self, current: u32, total: u32, label: &str) {
        log::debug!("[{current}/{total}] {label}");
    }
}
