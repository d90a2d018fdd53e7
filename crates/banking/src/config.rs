//! Lock policy configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_CRITICAL_SECTION_DELAY: Duration = Duration::from_millis(10);

pub const LOCK_TIMEOUT_ENV: &str = "TELLER_LOCK_TIMEOUT_MS";
pub const CRITICAL_SECTION_DELAY_ENV: &str = "TELLER_CRITICAL_SECTION_DELAY_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} (expected milliseconds)")]
    InvalidValue { var: &'static str, value: String },
}

/// How long account operations wait for a lock, and how long they stay inside
/// the critical section.
///
/// `critical_section_delay` simulates I/O latency while the lock is held so
/// that contention is observable; `Duration::ZERO` turns it off.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPolicy {
    #[serde(with = "millis", default = "default_lock_timeout")]
    pub lock_timeout: Duration,
    #[serde(with = "millis", default = "default_critical_section_delay")]
    pub critical_section_delay: Duration,
}

fn default_lock_timeout() -> Duration {
    DEFAULT_LOCK_TIMEOUT
}

fn default_critical_section_delay() -> Duration {
    DEFAULT_CRITICAL_SECTION_DELAY
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            critical_section_delay: DEFAULT_CRITICAL_SECTION_DELAY,
        }
    }
}

impl LockPolicy {
    pub fn new(lock_timeout: Duration, critical_section_delay: Duration) -> Self {
        Self {
            lock_timeout,
            critical_section_delay,
        }
    }

    /// Read the policy from `TELLER_LOCK_TIMEOUT_MS` and
    /// `TELLER_CRITICAL_SECTION_DELAY_MS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut policy = Self::default();
        if let Some(ms) = parse_millis(LOCK_TIMEOUT_ENV, lookup(LOCK_TIMEOUT_ENV))? {
            policy.lock_timeout = ms;
        }
        if let Some(ms) = parse_millis(
            CRITICAL_SECTION_DELAY_ENV,
            lookup(CRITICAL_SECTION_DELAY_ENV),
        )? {
            policy.critical_section_delay = ms;
        }
        Ok(policy)
    }

    /// Sleep for the configured critical-section delay, if any.
    pub(crate) fn simulate_latency(&self) {
        if !self.critical_section_delay.is_zero() {
            std::thread::sleep(self.critical_section_delay);
        }
    }
}

fn parse_millis(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|_| ConfigError::InvalidValue { var, value })
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let policy = LockPolicy::from_lookup(lookup(&[])).unwrap();
        assert_eq!(policy, LockPolicy::default());
        assert_eq!(policy.lock_timeout, Duration::from_millis(500));
        assert_eq!(policy.critical_section_delay, Duration::from_millis(10));
    }

    #[test]
    fn reads_overrides() {
        let policy = LockPolicy::from_lookup(lookup(&[
            (LOCK_TIMEOUT_ENV, "50"),
            (CRITICAL_SECTION_DELAY_ENV, " 0 "),
        ]))
        .unwrap();
        assert_eq!(policy.lock_timeout, Duration::from_millis(50));
        assert_eq!(policy.critical_section_delay, Duration::ZERO);
    }

    #[test]
    fn rejects_garbage() {
        let err = LockPolicy::from_lookup(lookup(&[(LOCK_TIMEOUT_ENV, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: LOCK_TIMEOUT_ENV,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn deserializes_millis_with_defaults() {
        let policy: LockPolicy = serde_json::from_str(r#"{"lock_timeout": 20}"#).unwrap();
        assert_eq!(policy.lock_timeout, Duration::from_millis(20));
        assert_eq!(policy.critical_section_delay, DEFAULT_CRITICAL_SECTION_DELAY);
    }
}
