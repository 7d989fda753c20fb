//! Configuration management for vrcore.
//!
//! Provides the profile catalog (scanner flags, enumeration parameters) and
//! the runtime settings that ride along in the same JSON file.

mod profiles;
mod settings;

pub use profiles::{
    EnumProfile, ProfileCatalog, ScanProfile, DEFAULT_ENUM_PROFILE, DEFAULT_SCAN_PROFILE,
};
pub use settings::{
    RuntimeSettings, DEFAULT_CONCURRENCY, DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_TOOL_TIMEOUT_SECS,
};
