//! In-process lock registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::LockError;

/// Default wait before giving up on a lock (30 seconds).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// How a lease shares its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// One holder at a time.
    Exclusive,
    /// Many holders; waits only behind an exclusive holder.
    Shared,
}

// Held only for its drop.
#[allow(dead_code)]
enum LeaseGuard {
    Exclusive(OwnedRwLockWriteGuard<()>),
    Shared(OwnedRwLockReadGuard<()>),
}

/// A held lock. Dropping the lease releases it.
pub struct RunLease {
    resource: String,
    mode: LockMode,
    holder_id: Uuid,
    acquired_at: DateTime<Utc>,
    _guard: LeaseGuard,
}

impl RunLease {
    /// Returns the locked resource.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Returns the lease mode.
    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }

    /// Returns the unique holder ID.
    #[must_use]
    pub const fn holder_id(&self) -> Uuid {
        self.holder_id
    }

    /// Returns when the lease was granted.
    #[must_use]
    pub const fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

impl std::fmt::Debug for RunLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLease")
            .field("resource", &self.resource)
            .field("mode", &self.mode)
            .field("holder_id", &self.holder_id)
            .field("acquired_at", &self.acquired_at)
            .finish_non_exhaustive()
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        debug!(
            resource = %self.resource,
            holder = %self.holder_id,
            mode = ?self.mode,
            "run lock released"
        );
    }
}

/// Registry of named locks shared by every run in the process.
///
/// Cloning the registry shares the underlying locks.
#[derive(Debug, Clone, Default)]
pub struct RunLockRegistry {
    locks: Arc<DashMap<String, Arc<RwLock<()>>>>,
}

impl RunLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, resource: &str) -> Arc<RwLock<()>> {
        Arc::clone(self.locks.entry(resource.to_string()).or_default().value())
    }

    /// Acquires a lease on `resource`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Timeout` if the lease is not granted in time.
    pub async fn acquire(
        &self,
        resource: &str,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<RunLease, LockError> {
        let lock = self.handle(resource);
        let granted = match mode {
            LockMode::Exclusive => tokio::time::timeout(timeout, lock.write_owned())
                .await
                .map(LeaseGuard::Exclusive),
            LockMode::Shared => tokio::time::timeout(timeout, lock.read_owned())
                .await
                .map(LeaseGuard::Shared),
        };

        let Ok(guard) = granted else {
            warn!(resource, ?mode, ?timeout, "run lock wait timed out");
            return Err(LockError::Timeout {
                resource: resource.to_string(),
                waited: timeout,
            });
        };

        let lease = RunLease {
            resource: resource.to_string(),
            mode,
            holder_id: Uuid::now_v7(),
            acquired_at: Utc::now(),
            _guard: guard,
        };
        info!(resource, holder = %lease.holder_id, ?mode, "run lock acquired");
        Ok(lease)
    }

    /// Releases a lease.
    pub fn release(&self, lease: RunLease) {
        drop(lease);
    }

    /// Returns true if any lease is currently held on `resource`.
    #[must_use]
    pub fn is_held(&self, resource: &str) -> bool {
        self.locks
            .get(resource)
            .is_some_and(|lock| lock.try_write().is_err())
    }
}
