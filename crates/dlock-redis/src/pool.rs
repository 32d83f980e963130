//! Bounded pool of physical Redis connections.
//!
//! Every slot holds its own TCP connection, authenticated and
//! database-selected at dial time. Borrowed connections are checked out
//! exclusively for one command; the guard returns them on drop unless the
//! command errored, in which case the caller discards the connection and
//! the next borrow dials a fresh one. There is no internal retry or
//! backoff: retry cadence is driven entirely by caller borrow attempts.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use redis::aio::MultiplexedConnection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use dlock_core::{LockError, Result};

use crate::settings::RedisSetting;

/// Connections idle for less than this are reused without a liveness probe.
const TEST_ON_BORROW_AFTER: Duration = Duration::from_secs(60);

struct IdleConn {
    conn: MultiplexedConnection,
    returned_at: Instant,
}

/// Pool of ready-to-use connections for one configured Redis target.
///
/// Idle connections are reaped lazily on borrow once they exceed the
/// configured idle timeout. The semaphore bounds concurrently borrowed
/// connections to the active cap.
pub(crate) struct ConnectionPool {
    client: redis::Client,
    setting: RedisSetting,
    idle: Mutex<Vec<IdleConn>>,
    permits: Arc<Semaphore>,
}

impl ConnectionPool {
    pub(crate) fn new(setting: RedisSetting) -> Result<Arc<Self>> {
        let client = redis::Client::open(format!("redis://{}", setting.server))
            .map_err(|e| LockError::Connection(e.to_string()))?;

        Ok(Arc::new(Self {
            client,
            permits: Arc::new(Semaphore::new(setting.active)),
            idle: Mutex::new(Vec::new()),
            setting,
        }))
    }

    /// Eagerly borrows one connection so that an unreachable server, a
    /// rejected credential, or a bad database selector surfaces at open
    /// time instead of at the first `lock`. The connection goes straight
    /// back to the idle list.
    pub(crate) async fn verify(self: &Arc<Self>) -> Result<()> {
        let probe = self.get().await?;
        drop(probe);
        Ok(())
    }

    /// Borrows a connection, preferring the most recently returned idle one.
    ///
    /// Idle connections past the idle timeout are dropped; ones idle for
    /// over a minute must answer a `PING` before reuse. When no idle
    /// connection survives, a fresh one is dialed.
    pub(crate) async fn get(self: &Arc<Self>) -> Result<PooledConn> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LockError::NotConnected)?;

        while let Some(idle) = self.pop_idle() {
            let age = idle.returned_at.elapsed();
            if age >= self.setting.timeout {
                debug!(idle_secs = age.as_secs(), "dropping expired idle connection");
                continue;
            }

            let mut conn = idle.conn;
            if age < TEST_ON_BORROW_AFTER {
                return Ok(PooledConn::new(conn, Arc::clone(self), permit));
            }

            let probe: redis::RedisResult<()> = redis::cmd("PING").query_async(&mut conn).await;
            match probe {
                Ok(()) => return Ok(PooledConn::new(conn, Arc::clone(self), permit)),
                Err(e) => {
                    warn!(error = %e, "redis ping failed, discarding idle connection");
                }
            }
        }

        let conn = self.dial().await?;
        Ok(PooledConn::new(conn, Arc::clone(self), permit))
    }

    /// Drops every idle connection. Outstanding borrows are unaffected and
    /// simply get dropped instead of returned once their guards release.
    pub(crate) fn drain(&self) {
        self.idle_list().clear();
    }

    /// Dials, authenticates, and selects the database on one physical
    /// connection. Failures are logged and propagated without retrying;
    /// the next borrow attempt constructs a fresh connection instead.
    async fn dial(&self) -> Result<MultiplexedConnection> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                warn!(server = %self.setting.server, error = %e, "redis dial failed");
                LockError::Connection(e.to_string())
            })?;

        if !self.setting.password.is_empty() {
            let auth: redis::RedisResult<()> = redis::cmd("AUTH")
                .arg(&self.setting.password)
                .query_async(&mut conn)
                .await;
            if let Err(e) = auth {
                warn!(server = %self.setting.server, error = %e, "redis auth failed");
                return Err(LockError::Connection(e.to_string()));
            }
        }

        if !self.setting.database.is_empty() {
            let select: redis::RedisResult<()> = redis::cmd("SELECT")
                .arg(&self.setting.database)
                .query_async(&mut conn)
                .await;
            if let Err(e) = select {
                warn!(
                    server = %self.setting.server,
                    database = %self.setting.database,
                    error = %e,
                    "redis select failed"
                );
                return Err(LockError::Connection(e.to_string()));
            }
        }

        Ok(conn)
    }

    fn put(&self, conn: MultiplexedConnection) {
        let mut idle = self.idle_list();
        if idle.len() < self.setting.idle {
            idle.push(IdleConn {
                conn,
                returned_at: Instant::now(),
            });
        }
    }

    fn pop_idle(&self) -> Option<IdleConn> {
        self.idle_list().pop()
    }

    fn idle_list(&self) -> std::sync::MutexGuard<'_, Vec<IdleConn>> {
        match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Exclusive checkout of one pooled connection.
///
/// Dropping the guard returns the connection to the idle list (subject to
/// the idle cap) and releases its active-cap permit. After a command error
/// the caller must call [`discard`](Self::discard) so the broken connection
/// is dropped instead of recycled.
pub(crate) struct PooledConn {
    conn: Option<MultiplexedConnection>,
    pool: Arc<ConnectionPool>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConn {
    fn new(
        conn: MultiplexedConnection,
        pool: Arc<ConnectionPool>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            pool,
            _permit: permit,
        }
    }

    pub(crate) fn as_mut(&mut self) -> &mut MultiplexedConnection {
        // Only `discard` empties the slot, and it consumes the guard.
        self.conn.as_mut().expect("pooled connection already taken")
    }

    /// Consumes the guard without returning the connection to the pool.
    pub(crate) fn discard(mut self) {
        self.conn = None;
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put(conn);
        }
    }
}
