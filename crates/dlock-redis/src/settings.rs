//! Normalization of the loosely typed setting bag into a complete
//! [`RedisSetting`].
//!
//! Resolution is best-effort and total: unknown keys, wrong JSON types,
//! non-positive numbers and malformed duration strings are all ignored
//! silently, keeping the prior value. Misconfiguration never raises an
//! error here; it surfaces later as a connection failure, if at all.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

/// Resolved connection settings for one Redis target.
#[derive(Debug, Clone)]
pub struct RedisSetting {
    /// Store endpoint, `host:port`.
    pub server: String,
    /// `AUTH` credential; skipped when empty.
    pub password: String,
    /// Logical database passed to `SELECT`; skipped when empty.
    pub database: String,
    /// Max idle pooled connections.
    pub idle: usize,
    /// Max concurrently borrowed connections.
    pub active: usize,
    /// Idle-connection expiry.
    pub timeout: Duration,
}

impl Default for RedisSetting {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:6379".to_string(),
            password: String::new(),
            database: String::new(),
            idle: 30,
            active: 100,
            timeout: Duration::from_secs(240),
        }
    }
}

impl RedisSetting {
    /// Fills a setting from the instance's configuration bag.
    ///
    /// Recognized keys: `server`, `password`, `database`, `idle`, `active`,
    /// `timeout` (integer seconds or a duration string such as `"90s"`,
    /// `"2m"`, `"1h"`, `"1500ms"`).
    pub fn resolve(setting: &HashMap<String, Value>) -> Self {
        let mut resolved = Self::default();

        if let Some(server) = setting.get("server").and_then(Value::as_str) {
            if !server.is_empty() {
                resolved.server = server.to_string();
            }
        }
        if let Some(password) = setting.get("password").and_then(Value::as_str) {
            if !password.is_empty() {
                resolved.password = password.to_string();
            }
        }
        if let Some(database) = setting.get("database").and_then(Value::as_str) {
            resolved.database = database.to_string();
        }
        if let Some(idle) = setting.get("idle").and_then(Value::as_i64) {
            if idle > 0 {
                resolved.idle = idle as usize;
            }
        }
        if let Some(active) = setting.get("active").and_then(Value::as_i64) {
            if active > 0 {
                resolved.active = active as usize;
            }
        }
        match setting.get("timeout") {
            Some(Value::Number(n)) => {
                if let Some(secs) = n.as_i64() {
                    if secs > 0 {
                        resolved.timeout = Duration::from_secs(secs as u64);
                    }
                }
            }
            Some(Value::String(s)) => {
                if let Some(timeout) = parse_duration(s) {
                    resolved.timeout = timeout;
                }
            }
            _ => {}
        }

        resolved
    }
}

/// Parses a Go-style duration string (`"1500ms"`, `"90s"`, `"2m"`, `"1h"`;
/// a bare number means seconds). Returns `None` on anything malformed.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, unit_ms) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, 1u64)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1_000)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60_000)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3_600_000)
    } else {
        (s, 1_000)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_millis(num.checked_mul(unit_ms)?))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn bag(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_empty_bag_yields_defaults() {
        let setting = RedisSetting::resolve(&HashMap::new());
        assert_eq!(setting.server, "127.0.0.1:6379");
        assert_eq!(setting.password, "");
        assert_eq!(setting.database, "");
        assert_eq!(setting.idle, 30);
        assert_eq!(setting.active, 100);
        assert_eq!(setting.timeout, Duration::from_secs(240));
    }

    #[test]
    fn test_full_override() {
        let setting = RedisSetting::resolve(&bag(&[
            ("server", json!("redis.internal:6380")),
            ("password", json!("hunter2")),
            ("database", json!("3")),
            ("idle", json!(5)),
            ("active", json!(20)),
            ("timeout", json!(60)),
        ]));
        assert_eq!(setting.server, "redis.internal:6380");
        assert_eq!(setting.password, "hunter2");
        assert_eq!(setting.database, "3");
        assert_eq!(setting.idle, 5);
        assert_eq!(setting.active, 20);
        assert_eq!(setting.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_wrong_types_fall_back_silently() {
        let setting = RedisSetting::resolve(&bag(&[
            ("server", json!(42)),
            ("password", json!(["nope"])),
            ("idle", json!("ten")),
            ("active", json!(true)),
            ("timeout", json!(null)),
        ]));
        assert_eq!(setting.server, "127.0.0.1:6379");
        assert_eq!(setting.password, "");
        assert_eq!(setting.idle, 30);
        assert_eq!(setting.active, 100);
        assert_eq!(setting.timeout, Duration::from_secs(240));
    }

    #[test]
    fn test_non_positive_numbers_ignored() {
        let setting = RedisSetting::resolve(&bag(&[
            ("idle", json!(0)),
            ("active", json!(-7)),
            ("timeout", json!(-1)),
        ]));
        assert_eq!(setting.idle, 30);
        assert_eq!(setting.active, 100);
        assert_eq!(setting.timeout, Duration::from_secs(240));
    }

    #[test]
    fn test_empty_server_and_password_keep_defaults() {
        let setting = RedisSetting::resolve(&bag(&[
            ("server", json!("")),
            ("password", json!("")),
        ]));
        assert_eq!(setting.server, "127.0.0.1:6379");
        assert_eq!(setting.password, "");
    }

    #[test]
    fn test_timeout_duration_string() {
        let setting = RedisSetting::resolve(&bag(&[("timeout", json!("90s"))]));
        assert_eq!(setting.timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_malformed_timeout_string_keeps_default() {
        let setting = RedisSetting::resolve(&bag(&[("timeout", json!("soon"))]));
        assert_eq!(setting.timeout, Duration::from_secs(240));
    }

    #[rstest]
    #[case("1500ms", Duration::from_millis(1500))]
    #[case("90s", Duration::from_secs(90))]
    #[case("2m", Duration::from_secs(120))]
    #[case("1h", Duration::from_secs(3600))]
    #[case("45", Duration::from_secs(45))]
    #[case(" 30s ", Duration::from_secs(30))]
    fn test_parse_duration_ok(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("s")]
    #[case("-5s")]
    #[case("1.5h")]
    #[case("five minutes")]
    fn test_parse_duration_malformed(#[case] input: &str) {
        assert_eq!(parse_duration(input), None);
    }
}
