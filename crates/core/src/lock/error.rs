//! Run lock error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while acquiring a run lock.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock was not granted within the timeout.
    #[error("Timed out after {waited:?} waiting for lock on '{resource}'")]
    Timeout {
        /// Resource name.
        resource: String,
        /// Time spent waiting.
        waited: Duration,
    },
}
