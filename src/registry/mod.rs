//! Target registry persistence.
//!
//! The registry is a CSV table, header row first, with fixed column positions.
//! Columns not listed here are carried through verbatim.

mod csv_store;

pub use csv_store::{RegistrySnapshot, RegistryStore, RegistryUpdate};

pub const COL_ID: usize = 0;
pub const COL_LABEL: usize = 1;
pub const COL_ADDRESS: usize = 2;
pub const COL_SCOPE: usize = 3;
pub const COL_RESERVED: usize = 4;
pub const COL_OS_TECH: usize = 5;
pub const COL_PORTS: usize = 6;
pub const COL_SERVICES: usize = 7;

/// Rows with fewer fields than this are skipped.
pub const MIN_FIELDS: usize = 3;

/// Separator for the ports and services columns.
pub const LIST_SEPARATOR: &str = "|";

/// Header written by `registry init`.
pub const SCHEMA_HEADERS: [&str; 10] = [
    "Target_ID",
    "Target_Name",
    "Input_Value",
    "Scope_Status",
    "Resolved_IP",
    "OS_Tech",
    "Open_Ports",
    "Services",
    "Auth_Method",
    "Notes",
];
