//! Backend abstraction for distributed mutual exclusion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::InstanceConfig;
use crate::error::Result;

/// Factory for lock sessions against one kind of store.
///
/// `connect` performs no I/O: it only normalizes configuration into a
/// session object. Reachability is verified later by [`LockSession::open`].
pub trait LockDriver: Send + Sync {
    fn connect(&self, config: InstanceConfig) -> Result<Arc<dyn LockSession>>;
}

/// One configured target store, long-lived for the process lifetime.
///
/// Lock state is never cached in process memory; ownership is fully
/// delegated to the store's key presence and expiry. All methods may be
/// called from concurrent tasks.
#[async_trait]
pub trait LockSession: Send + Sync {
    /// Builds the connection pool and eagerly verifies the store is
    /// reachable (including authentication and database selection).
    async fn open(&self) -> Result<()>;

    /// Releases all pooled connections. Calling it without a prior `open`
    /// is a no-op, not an error.
    async fn close(&self) -> Result<()>;

    /// Tries once to acquire `key` for `expiry`. A zero `expiry` substitutes
    /// the instance's configured default lease.
    ///
    /// Returns `AlreadyLocked` when another holder owns the key; the caller
    /// decides whether to poll again. There is no blocking wait.
    async fn lock(&self, key: &str, expiry: Duration) -> Result<()>;

    /// Releases `key` by deleting it. Succeeds even if the key was never
    /// present or has already expired.
    async fn unlock(&self, key: &str) -> Result<()>;
}
