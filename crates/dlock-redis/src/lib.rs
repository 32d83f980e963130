//! Redis lock driver for dlock.
//!
//! Implements the `dlock-core` contract on top of a Redis instance (or any
//! store speaking the same command surface): acquisition is a single atomic
//! `SET key token NX PX ms`, release is a plain `DEL`, and the store's own
//! key expiry bounds every lease. Connections are pooled, authenticated and
//! database-selected per physical connection, and health-checked on borrow.

mod pool;
mod session;
mod settings;

use std::sync::Arc;

use dlock_core::Registry;

pub use session::{RedisLockDriver, RedisLockSession};
pub use settings::RedisSetting;

/// Name the driver registers under.
pub const DRIVER_NAME: &str = "redis";

/// Makes the Redis driver discoverable through `registry`.
///
/// Call this from application start-up code; nothing registers itself as a
/// side effect of linking this crate.
pub fn register(registry: &Registry) {
    registry.register(DRIVER_NAME, Arc::new(RedisLockDriver));
}
