//! Per-instance configuration handed to a driver's `connect`.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

/// Default lease applied when a caller passes a zero expiry and the host
/// configured nothing else.
const DEFAULT_EXPIRY: Duration = Duration::from_secs(60);

/// Configuration for one lock backend instance.
///
/// The setting bag is deliberately loose: hosts assemble it from config
/// files or environment without knowing which keys a given driver
/// recognizes. Drivers normalize it with their own resolver and never fail
/// on unknown or malformed entries.
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    /// Driver-specific options (e.g. `server`, `password`, `timeout`).
    pub setting: HashMap<String, Value>,
    // Kept private so the positive-lease invariant cannot be bypassed by
    // assigning a zero duration directly.
    expiry: Duration,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            setting: HashMap::new(),
            expiry: DEFAULT_EXPIRY,
        }
    }
}

impl InstanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one entry to the setting bag.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.setting.insert(key.into(), value.into());
        self
    }

    /// Sets the default lease duration. A zero duration is ignored so the
    /// lease stays positive.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        if !expiry.is_zero() {
            self.expiry = expiry;
        }
        self
    }

    /// Default lease duration, substituted when `lock` is called with a
    /// zero expiry. Always positive.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_expiry_is_positive() {
        let config = InstanceConfig::default();
        assert!(!config.expiry().is_zero());
        assert!(config.setting.is_empty());
    }

    #[test]
    fn test_zero_expiry_keeps_prior_value() {
        let config = InstanceConfig::new()
            .with_expiry(Duration::from_secs(5))
            .with_expiry(Duration::ZERO);
        assert_eq!(config.expiry(), Duration::from_secs(5));
    }

    #[test]
    fn test_expiry_stays_positive_through_builder() {
        // Only `with_expiry` can touch the lease, so a zero request leaves
        // the default intact rather than producing a zero lease.
        let config = InstanceConfig::new().with_expiry(Duration::ZERO);
        assert!(!config.expiry().is_zero());
    }

    #[test]
    fn test_with_setting_accumulates() {
        let config = InstanceConfig::new()
            .with_setting("server", "10.0.0.1:6379")
            .with_setting("idle", 5);
        assert_eq!(
            config.setting.get("server").and_then(|v| v.as_str()),
            Some("10.0.0.1:6379")
        );
        assert_eq!(config.setting.get("idle").and_then(|v| v.as_i64()), Some(5));
    }
}
