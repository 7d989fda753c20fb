//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output. Logs go to
//! stderr through `tracing`; everything here writes results to stdout,
//! except the error and warning printers.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::print_registry_csv;
pub use json_format::print_json;
pub use plain::{
    print_batch_header, print_batch_summary, print_catalog, print_enum_profile, print_error,
    print_info, print_registry, print_scan_profile, print_success, print_warning,
};
