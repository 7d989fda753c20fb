//! Scan and enumeration profile catalog.
//!
//! Profiles are named, immutable parameter bundles loaded once at startup
//! from a JSON document shaped like:
//!
//! ```json
//! {
//!   "nmap": { "scan_profiles": { "framework_aggressive": { "flags": "-sV -O -T4" } } },
//!   "ffuf": { "profiles": { "stealth": { "threads": 5, "delay": 0.5, "extensions": ".php" } } }
//! }
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::settings::RuntimeSettings;

/// Scan profile used when none is named on the command line.
pub const DEFAULT_SCAN_PROFILE: &str = "framework_aggressive";

/// Enumeration profile used when none is named on the command line.
pub const DEFAULT_ENUM_PROFILE: &str = "stealth";

/// Flags for the port scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProfile {
    /// Whitespace-separated scanner flags.
    #[serde(default)]
    pub flags: String,
}

impl ScanProfile {
    pub fn new(flags: impl Into<String>) -> Self {
        Self {
            flags: flags.into(),
        }
    }

    /// Whether the flags already request every port (`-p-`).
    pub fn sweeps_all_ports(&self) -> bool {
        self.flags.contains("-p-")
    }
}

/// Parameters for the content-discovery tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumProfile {
    /// Worker threads.
    pub threads: u32,
    /// Delay between requests, in seconds.
    #[serde(default)]
    pub delay: f64,
    /// Comma-separated extensions, may be empty.
    #[serde(default)]
    pub extensions: String,
}

impl EnumProfile {
    fn validate(&self, name: &str) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidProfile {
                name: name.to_string(),
                reason: "threads must be at least 1".to_string(),
            });
        }

        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(ConfigError::InvalidProfile {
                name: name.to_string(),
                reason: format!("delay must be a non-negative number, got {}", self.delay),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScannerSection {
    #[serde(default)]
    scan_profiles: BTreeMap<String, ScanProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EnumeratorSection {
    #[serde(default)]
    profiles: BTreeMap<String, EnumProfile>,
}

/// On-disk layout of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    nmap: ScannerSection,
    #[serde(default)]
    ffuf: EnumeratorSection,
    #[serde(default)]
    runtime: RuntimeSettings,
}

/// All profiles and runtime settings for one run.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    scan_profiles: BTreeMap<String, ScanProfile>,
    enum_profiles: BTreeMap<String, EnumProfile>,
    runtime: RuntimeSettings,
}

impl ProfileCatalog {
    /// Load and validate a catalog from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate a catalog from JSON text.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let doc: ConfigDocument =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for (name, profile) in &doc.ffuf.profiles {
            profile.validate(name)?;
        }
        doc.runtime.validate()?;

        Ok(Self {
            scan_profiles: doc.nmap.scan_profiles,
            enum_profiles: doc.ffuf.profiles,
            runtime: doc.runtime,
        })
    }

    /// Built-in starter catalog.
    pub fn builtin() -> Self {
        let mut scan_profiles = BTreeMap::new();
        scan_profiles.insert(
            DEFAULT_SCAN_PROFILE.to_string(),
            ScanProfile::new("-sS -sV -O -T4 --top-ports 1000"),
        );
        scan_profiles.insert(
            "full_sweep".to_string(),
            ScanProfile::new("-sS -sV -O -T4 -p-"),
        );

        let mut enum_profiles = BTreeMap::new();
        enum_profiles.insert(
            DEFAULT_ENUM_PROFILE.to_string(),
            EnumProfile {
                threads: 5,
                delay: 0.5,
                extensions: ".php,.html,.txt".to_string(),
            },
        );
        enum_profiles.insert(
            "aggressive".to_string(),
            EnumProfile {
                threads: 40,
                delay: 0.0,
                extensions: ".php,.asp,.aspx,.jsp,.html,.js,.txt,.bak,.zip".to_string(),
            },
        );

        Self {
            scan_profiles,
            enum_profiles,
            runtime: RuntimeSettings::default(),
        }
    }

    /// Serialize to the on-disk JSON layout.
    pub fn to_json(&self) -> ConfigResult<String> {
        let doc = ConfigDocument {
            nmap: ScannerSection {
                scan_profiles: self.scan_profiles.clone(),
            },
            ffuf: EnumeratorSection {
                profiles: self.enum_profiles.clone(),
            },
            runtime: self.runtime.clone(),
        };

        Ok(serde_json::to_string_pretty(&doc)?)
    }

    /// Write to `path`, refusing to clobber an existing file unless `force`.
    pub fn save(&self, path: &Path, force: bool) -> ConfigResult<()> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let write_err = |e: std::io::Error| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        std::fs::write(path, self.to_json()?).map_err(write_err)
    }

    /// Look up a scan profile by name.
    pub fn scan_profile(&self, name: &str) -> ConfigResult<&ScanProfile> {
        self.scan_profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                kind: "scan",
                name: name.to_string(),
            })
    }

    /// Look up an enumeration profile by name.
    pub fn enum_profile(&self, name: &str) -> ConfigResult<&EnumProfile> {
        self.enum_profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                kind: "enumeration",
                name: name.to_string(),
            })
    }

    pub fn scan_profiles(&self) -> impl Iterator<Item = (&str, &ScanProfile)> {
        self.scan_profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn enum_profiles(&self) -> impl Iterator<Item = (&str, &EnumProfile)> {
        self.enum_profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nmap": {
            "scan_profiles": {
                "framework_aggressive": { "flags": "-sV -O -T4" },
                "sweep": { "flags": "-sS -p-" }
            }
        },
        "ffuf": {
            "profiles": {
                "stealth": { "threads": 5, "delay": 0.25, "extensions": ".php,.bak" }
            }
        }
    }"#;

    #[test]
    fn test_load_sample_catalog() {
        let catalog = ProfileCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(
            catalog.scan_profile("framework_aggressive").unwrap().flags,
            "-sV -O -T4"
        );
        let stealth = catalog.enum_profile("stealth").unwrap();
        assert_eq!(stealth.threads, 5);
        assert_eq!(stealth.delay, 0.25);
        assert_eq!(catalog.runtime(), &RuntimeSettings::default());
    }

    #[test]
    fn test_sweep_detection() {
        let catalog = ProfileCatalog::from_json(SAMPLE).unwrap();
        assert!(catalog.scan_profile("sweep").unwrap().sweeps_all_ports());
        assert!(!catalog
            .scan_profile("framework_aggressive")
            .unwrap()
            .sweeps_all_ports());
    }

    #[test]
    fn test_missing_profile() {
        let catalog = ProfileCatalog::from_json(SAMPLE).unwrap();
        assert!(matches!(
            catalog.scan_profile("nope"),
            Err(ConfigError::ProfileNotFound { kind: "scan", .. })
        ));
        assert!(matches!(
            catalog.enum_profile("nope"),
            Err(ConfigError::ProfileNotFound {
                kind: "enumeration",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            ProfileCatalog::from_json("{ not json"),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_enum_profile_rejected() {
        let doc = r#"{ "ffuf": { "profiles": { "bad": { "threads": 0, "delay": 1.0 } } } }"#;
        assert!(matches!(
            ProfileCatalog::from_json(doc),
            Err(ConfigError::InvalidProfile { .. })
        ));

        let doc = r#"{ "ffuf": { "profiles": { "bad": { "threads": 2, "delay": -1.0 } } } }"#;
        assert!(ProfileCatalog::from_json(doc).is_err());
    }

    #[test]
    fn test_zero_probe_timeout_in_catalog_rejected() {
        let doc = r#"{ "runtime": { "probe_timeout_secs": 0 } }"#;
        assert!(matches!(
            ProfileCatalog::from_json(doc),
            Err(ConfigError::InvalidSetting {
                field: "probe_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_builtin_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("profiles.json");

        ProfileCatalog::builtin().save(&path, false).unwrap();
        let loaded = ProfileCatalog::load(&path).unwrap();
        assert!(loaded.scan_profile(DEFAULT_SCAN_PROFILE).is_ok());
        assert!(loaded.enum_profile(DEFAULT_ENUM_PROFILE).is_ok());

        assert!(matches!(
            ProfileCatalog::builtin().save(&path, false),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert!(ProfileCatalog::builtin().save(&path, true).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ProfileCatalog::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }
}
