//! Explicit driver registry.
//!
//! Drivers are made discoverable by name through a registration call made
//! by application start-up code, never as a side effect of linking a crate.
//! The registry's lifecycle is owned by the host: created at startup, torn
//! down with [`Registry::shutdown`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::InstanceConfig;
use crate::error::{LockError, Result};
use crate::lock::{LockDriver, LockSession};

/// Name-to-driver map with a defined startup/shutdown lifecycle.
#[derive(Default)]
pub struct Registry {
    drivers: RwLock<HashMap<String, Arc<dyn LockDriver>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `driver` under `name`. Registering the same name twice
    /// replaces the earlier driver.
    pub fn register(&self, name: impl Into<String>, driver: Arc<dyn LockDriver>) {
        let mut drivers = match self.drivers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        drivers.insert(name.into(), driver);
    }

    /// Instantiates a session from the driver registered under `name`.
    pub fn connect(&self, name: &str, config: InstanceConfig) -> Result<Arc<dyn LockSession>> {
        let driver = {
            let drivers = match self.drivers.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            drivers.get(name).cloned()
        };
        match driver {
            Some(driver) => driver.connect(config),
            None => Err(LockError::Connection(format!(
                "no lock driver registered under {:?}",
                name
            ))),
        }
    }

    /// Drops all registered drivers.
    pub fn shutdown(&self) {
        let mut drivers = match self.drivers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        drivers.clear();
    }
}
