//! # Mirror Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{MirrorError, MirrorResult};

/// Configuration for one mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Bound on subscribe and the initial fetch, in milliseconds (default: 10s)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Bound on each mutation request, in milliseconds (default: 10s)
    #[serde(default = "default_mutation_timeout_ms")]
    pub mutation_timeout_ms: u64,

    /// Fail update/delete of ids absent from a live mirror without
    /// contacting the remote (default: false, the remote decides)
    #[serde(default)]
    pub strict_local_lookup: bool,
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_mutation_timeout_ms() -> u64 {
    10_000
}

/// Milliseconds in `duration`, rounding a non-zero sub-millisecond value up
/// to 1 and saturating at `u64::MAX`
fn whole_millis(duration: Duration) -> u64 {
    match u64::try_from(duration.as_millis()).unwrap_or(u64::MAX) {
        0 if !duration.is_zero() => 1,
        ms => ms,
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            mutation_timeout_ms: default_mutation_timeout_ms(),
            strict_local_lookup: false,
        }
    }
}

impl MirrorConfig {
    /// Enable local lookups before update/delete
    pub fn with_strict_local_lookup(mut self) -> Self {
        self.strict_local_lookup = true;
        self
    }

    /// Set both timeouts
    pub fn with_timeouts(mut self, fetch: Duration, mutation: Duration) -> Self {
        self.fetch_timeout_ms = whole_millis(fetch);
        self.mutation_timeout_ms = whole_millis(mutation);
        self
    }

    /// Bound on subscribe and fetch
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Bound on each mutation
    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_millis(self.mutation_timeout_ms)
    }

    /// Reject zero timeouts
    pub fn validate(&self) -> MirrorResult<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(MirrorError::InvalidConfig("fetch_timeout_ms must be > 0".into()));
        }
        if self.mutation_timeout_ms == 0 {
            return Err(MirrorError::InvalidConfig("mutation_timeout_ms must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.mutation_timeout(), Duration::from_secs(10));
        assert!(!config.strict_local_lookup);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MirrorConfig = serde_json::from_str(r#"{"strict_local_lookup": true}"#).unwrap();
        assert!(config.strict_local_lookup);
        assert_eq!(config.fetch_timeout_ms, 10_000);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = MirrorConfig {
            mutation_timeout_ms: 0,
            ..MirrorConfig::default()
        };
        assert!(matches!(config.validate(), Err(MirrorError::InvalidConfig(_))));
    }

    #[test]
    fn test_with_timeouts_does_not_truncate() {
        let config = MirrorConfig::default().with_timeouts(Duration::from_micros(500), Duration::MAX);
        assert_eq!(config.fetch_timeout_ms, 1);
        assert_eq!(config.mutation_timeout_ms, u64::MAX);
        assert!(config.validate().is_ok());

        let config = MirrorConfig::default().with_timeouts(Duration::ZERO, Duration::from_secs(2));
        assert_eq!(config.fetch_timeout_ms, 0);
        assert_eq!(config.mutation_timeout_ms, 2_000);
        assert!(config.validate().is_err());
    }
}
