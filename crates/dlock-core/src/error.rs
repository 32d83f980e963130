//! Error taxonomy shared by all lock backends.

/// Errors surfaced by lock drivers and sessions.
///
/// Every error is returned synchronously to the caller; nothing is retried
/// internally. A failed `lock` means "not acquired", a failed `unlock` means
/// "release not confirmed".
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The session's pool was never opened, or has been closed.
    #[error("lock backend is not connected")]
    NotConnected,

    /// Dial, authentication, or database-selection failure while
    /// establishing a physical connection, or a driver lookup failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other transport or protocol failure during a store command.
    #[error("store command failed: {0}")]
    Store(String),

    /// The conditional set completed but the key already existed.
    #[error("already locked")]
    AlreadyLocked,
}

impl LockError {
    /// True when a `lock` attempt lost to an existing holder, as opposed to
    /// failing outright.
    pub fn is_already_locked(&self) -> bool {
        matches!(self, LockError::AlreadyLocked)
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
