//! Cooperative compute primitives.
//!
//! This module provides the building blocks used by long-running
//! pipeline work:
//!
//! - [`CancellationToken`] — clone-shared cancellation flag
//! - [`Cancelled`] — error returned when work stops at a checkpoint
//! - [`TaskPool`] — scoped fork/join task pool
//! - [`ProgressTracker`] — cancellation query + progress reporting

mod cancellation;
mod progress;
mod task_pool;

pub use cancellation::{CancellationToken, Cancelled};
pub use progress::{NullProgress, ProgressTracker, TokenProgress};
pub use task_pool::{Scope, TaskPool};
