//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DispatchError;

/// Environment variable overriding [`DispatcherConfig::poll_interval_ms`].
pub const POLL_INTERVAL_ENV: &str = "RELAY_POLL_INTERVAL_MS";

/// Environment variable setting [`DispatcherConfig::handler_timeout_ms`].
pub const HANDLER_TIMEOUT_ENV: &str = "RELAY_HANDLER_TIMEOUT_MS";

/// Default poll interval: one second between dispatch cycles.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Tuning for the request dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct DispatcherConfig {
    /// Delay between the end of one dispatch cycle and the start of the next.
    pub poll_interval_ms: u64,

    /// Upper bound on how long the dispatcher waits for one handler.
    ///
    /// `None` waits indefinitely. When the bound is hit the request fails
    /// with a timeout and the dispatcher moves on; the handler thread itself
    /// cannot be interrupted and finishes in the background.
    pub handler_timeout_ms: Option<u64>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            handler_timeout_ms: None,
        }
    }
}

impl DispatcherConfig {
    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the handler timeout.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The poll interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The handler timeout as a [`Duration`], if any.
    #[must_use]
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidConfig`] for a zero poll interval or
    /// a zero handler timeout.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.poll_interval_ms == 0 {
            return Err(DispatchError::InvalidConfig(
                "poll interval must be at least 1 ms".to_owned(),
            ));
        }
        if self.handler_timeout_ms == Some(0) {
            return Err(DispatchError::InvalidConfig(
                "handler timeout must be at least 1 ms".to_owned(),
            ));
        }
        Ok(())
    }

    /// Build a config from the defaults, overridden by `RELAY_*` environment
    /// variables.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidConfig`] if a variable is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, DispatchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DispatchError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            config.poll_interval_ms = parse_millis(POLL_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(HANDLER_TIMEOUT_ENV) {
            config.handler_timeout_ms = Some(parse_millis(HANDLER_TIMEOUT_ENV, &raw)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, DispatchError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| DispatchError::InvalidConfig(format!("{key}='{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polls_every_second_without_timeout() {
        let config = DispatcherConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.handler_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = DispatcherConfig::from_lookup(|key| match key {
            POLL_INTERVAL_ENV => Some("250".to_owned()),
            HANDLER_TIMEOUT_ENV => Some(" 5000 ".to_owned()),
            _ => None,
        })
        .unwrap_or_else(|e| panic!("lookup failed: {e}"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.handler_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn lookup_rejects_garbage_and_zero() {
        let garbage = DispatcherConfig::from_lookup(|key| {
            (key == POLL_INTERVAL_ENV).then(|| "soon".to_owned())
        });
        assert!(matches!(garbage, Err(DispatchError::InvalidConfig(_))));

        let zero = DispatcherConfig::from_lookup(|key| {
            (key == POLL_INTERVAL_ENV).then(|| "0".to_owned())
        });
        assert!(matches!(zero, Err(DispatchError::InvalidConfig(_))));
    }

    #[test]
    fn deserializes_partial_json_onto_defaults() {
        let config: DispatcherConfig = match serde_json::from_str(r#"{"handler_timeout_ms":100}"#) {
            Ok(c) => c,
            Err(e) => panic!("invalid JSON: {e}"),
        };
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.handler_timeout(), Some(Duration::from_millis(100)));
    }
}
