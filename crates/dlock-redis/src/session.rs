//! The Redis lock session: pool lifecycle plus the Lock/Unlock protocol.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use dlock_core::{InstanceConfig, LockDriver, LockError, LockSession, Result};

use crate::pool::ConnectionPool;
use crate::settings::RedisSetting;

/// Driver entry point: resolves configuration into a [`RedisLockSession`].
pub struct RedisLockDriver;

impl LockDriver for RedisLockDriver {
    fn connect(&self, config: InstanceConfig) -> Result<Arc<dyn LockSession>> {
        Ok(Arc::new(RedisLockSession::new(config)))
    }
}

/// Lock session bound to one configured Redis target.
///
/// Holds no lock state of its own: a lock exists exactly while its key is
/// present in the store, and the store's key expiry enforces the lease with
/// no process-side bookkeeping. The pool slot sits behind an `RwLock` so a
/// `close`/`open` cannot race a concurrent `lock` reading the handle; the
/// read lock is not contended on the acquisition hot path.
pub struct RedisLockSession {
    setting: RedisSetting,
    default_expiry: Duration,
    pool: RwLock<Option<Arc<ConnectionPool>>>,
}

impl RedisLockSession {
    pub fn new(config: InstanceConfig) -> Self {
        Self {
            setting: RedisSetting::resolve(&config.setting),
            default_expiry: config.expiry(),
            pool: RwLock::new(None),
        }
    }

    async fn pool(&self) -> Result<Arc<ConnectionPool>> {
        self.pool.read().await.clone().ok_or(LockError::NotConnected)
    }

    /// Ownership token for one acquisition attempt: the current instant at
    /// nanosecond precision. Only needs to be distinguishable within a
    /// realistic lease window, not globally unique.
    fn token() -> String {
        Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string()
    }
}

#[async_trait]
impl LockSession for RedisLockSession {
    async fn open(&self) -> Result<()> {
        let pool = ConnectionPool::new(self.setting.clone())?;
        // The handle is installed before the reachability probe, so a
        // failed open still leaves lock/unlock reporting connection errors
        // rather than NotConnected.
        *self.pool.write().await = Some(Arc::clone(&pool));
        pool.verify().await
    }

    async fn close(&self) -> Result<()> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.drain();
        }
        Ok(())
    }

    async fn lock(&self, key: &str, expiry: Duration) -> Result<()> {
        let pool = self.pool().await?;

        let expiry = if expiry.is_zero() {
            self.default_expiry
        } else {
            expiry
        };
        let token = Self::token();

        let mut conn = pool.get().await?;
        let reply: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(expiry.as_millis() as u64)
            .query_async(conn.as_mut())
            .await;

        match reply {
            // Only an actual "OK" means the write was performed. A nil
            // reply is the store saying the key existed, not a transport
            // failure.
            Ok(Some(status)) if status == "OK" => {
                debug!(key, expiry_ms = expiry.as_millis() as u64, "lock acquired");
                Ok(())
            }
            Ok(_) => Err(LockError::AlreadyLocked),
            Err(e) => {
                conn.discard();
                Err(LockError::Store(e.to_string()))
            }
        }
    }

    /// Deletes `key` unconditionally.
    ///
    /// The stored ownership token is not verified first, so a stale unlock
    /// racing past the original lease's expiry can remove a lock acquired
    /// by a different holder. This matches the protocol as deployed; see
    /// DESIGN.md for the compare-and-delete alternative.
    async fn unlock(&self, key: &str) -> Result<()> {
        let pool = self.pool().await?;

        let mut conn = pool.get().await?;
        let reply: redis::RedisResult<i64> =
            redis::cmd("DEL").arg(key).query_async(conn.as_mut()).await;

        match reply {
            Ok(deleted) => {
                debug!(key, deleted, "lock released");
                Ok(())
            }
            Err(e) => {
                conn.discard();
                Err(LockError::Store(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RedisLockSession {
        RedisLockSession::new(InstanceConfig::default())
    }

    #[tokio::test]
    async fn test_lock_before_open_is_not_connected() {
        let err = session()
            .lock("job-1", Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LockError::NotConnected));
    }

    #[tokio::test]
    async fn test_unlock_before_open_is_not_connected() {
        let err = session().unlock("job-1").await.err().unwrap();
        assert!(matches!(err, LockError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_without_open_is_noop() {
        assert!(session().close().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let session = session();
        assert!(session.close().await.is_ok());
        assert!(session.close().await.is_ok());
    }

    #[test]
    fn test_tokens_are_monotonic_strings() {
        let a = RedisLockSession::token();
        std::thread::sleep(Duration::from_millis(2));
        let b = RedisLockSession::token();
        assert!(a.parse::<i64>().is_ok());
        assert!(b.parse::<i64>().unwrap() > a.parse::<i64>().unwrap());
    }

    #[test]
    fn test_driver_connect_resolves_settings() {
        let config = InstanceConfig::new().with_setting("server", "10.1.2.3:6390");
        assert!(RedisLockDriver.connect(config).is_ok());
    }
}
