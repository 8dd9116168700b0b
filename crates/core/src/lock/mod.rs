//! Named, timeout-bound run locks.
//!
//! A run takes an exclusive lease on its resource (for example `budget:<id>`)
//! so two runs over the same budget never overlap. Leases release on drop, so
//! every exit path of a run gives the lock back.

pub mod error;
pub mod registry;

#[cfg(test)]
mod tests;

pub use error::LockError;
pub use registry::{DEFAULT_LOCK_TIMEOUT, LockMode, RunLease, RunLockRegistry};
