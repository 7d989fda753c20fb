//! Runtime settings.
//!
//! Read from the optional `runtime` section of the profile configuration.
//! Every field has a default so older configuration files keep working.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of targets processed at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Default fingerprint probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 4;

/// Default deadline for a single external tool run.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 1800;

/// Settings that shape a run rather than a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Admission slots for the per-target worker pool.
    pub concurrency: usize,
    /// Timeout for each fingerprint request, in seconds.
    pub probe_timeout_secs: u64,
    /// Deadline for each scanner/enumerator run, in seconds. 0 disables it.
    pub tool_timeout_secs: u64,
    /// Port scanner executable.
    pub scanner_bin: String,
    /// Content-discovery executable.
    pub enumerator_bin: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            scanner_bin: "nmap".to_string(),
            enumerator_bin: "ffuf".to_string(),
        }
    }
}

impl RuntimeSettings {
    /// Reject values that would make every task fail or stall.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                field: "probe_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.scanner_bin.trim().is_empty() || self.enumerator_bin.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                field: "scanner_bin/enumerator_bin",
                reason: "executable name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Probe timeout as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Tool deadline, or `None` when disabled.
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.concurrency, 5);
        assert_eq!(settings.probe_timeout(), Duration::from_secs(4));
        assert_eq!(settings.scanner_bin, "nmap");
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: RuntimeSettings =
            serde_json::from_str(r#"{ "concurrency": 12, "tool_timeout_secs": 0 }"#).unwrap();
        assert_eq!(settings.concurrency, 12);
        assert_eq!(settings.tool_timeout(), None);
        assert_eq!(settings.enumerator_bin, "ffuf");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let settings = RuntimeSettings {
            probe_timeout_secs: 0,
            ..RuntimeSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidSetting {
                field: "probe_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let settings = RuntimeSettings {
            concurrency: 0,
            ..RuntimeSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
