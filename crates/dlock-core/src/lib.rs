//! Core traits and types for dlock backend drivers.
//!
//! This crate defines the abstractions shared between lock backends:
//! - `LockDriver`: instantiates a session from an instance configuration
//! - `LockSession`: pool lifecycle plus the `lock`/`unlock` operations
//! - `Registry`: explicit name-to-driver registration with a defined lifecycle
//! - `LockError`: the error taxonomy every backend maps onto

mod config;
mod error;
mod lock;
mod registry;

pub use config::InstanceConfig;
pub use error::{LockError, Result};
pub use lock::{LockDriver, LockSession};
pub use registry::Registry;
