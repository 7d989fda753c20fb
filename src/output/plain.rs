//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::config::{EnumProfile, ProfileCatalog, ScanProfile};
use crate::registry::{RegistrySnapshot, LIST_SEPARATOR};
use crate::scanner::{BatchReport, TaskStatus};
use console::style;
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

/// Print the batch header before any task starts.
pub fn print_batch_header(mode: &str, registry: &str, targets: usize, concurrency: usize) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("vrcore").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{} Mode: {}", style("•").dim(), style(mode).yellow());
    println!("{} Registry: {}", style("•").dim(), style(registry).white().bold());
    println!(
        "{} {} target(s), {} at a time",
        style("•").dim(),
        style(targets).white().bold(),
        concurrency
    );
    println!();
}

/// Print per-target outcomes and the final summary line.
pub fn print_batch_summary(report: &BatchReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;

    if report.outcomes.is_empty() {
        writeln!(out, "  {}", style("No targets to process.").dim())?;
    } else {
        writeln!(
            out,
            "  {:<10}  {:<20}  {:<6}  {}",
            style("ID").bold(),
            style("ADDRESS").bold(),
            style("RESULT").bold(),
            style("DETAIL").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for outcome in &report.outcomes {
            let (label, detail) = match &outcome.status {
                TaskStatus::Completed(detail) => (style("ok").green().bold(), detail),
                TaskStatus::Failed(reason) => (style("FAIL").red().bold(), reason),
            };
            writeln!(
                out,
                "  {:<10}  {:<20}  {:<6}  {}",
                outcome.id,
                truncate_string(&outcome.address, 20),
                label,
                truncate_string(detail, 60)
            )?;
        }
    }

    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "{} {} finished: {} succeeded, {} failed, {} skipped in {:.2}s",
        style("✓").green().bold(),
        report.mode,
        style(report.succeeded()).green().bold(),
        style(report.failed()).red(),
        style(report.skipped).yellow(),
        report.duration_ms() as f64 / 1000.0
    )?;

    Ok(())
}

/// Print every profile in the catalog.
pub fn print_catalog(catalog: &ProfileCatalog) {
    println!("{}", style("Scan profiles").bold());
    for (name, profile) in catalog.scan_profiles() {
        println!("  {:<24} {}", style(name).cyan(), profile.flags);
    }
    println!();
    println!("{}", style("Enumeration profiles").bold());
    for (name, profile) in catalog.enum_profiles() {
        println!(
            "  {:<24} threads={} delay={}s ext={}",
            style(name).cyan(),
            profile.threads,
            profile.delay,
            profile.extensions
        );
    }
}

pub fn print_scan_profile(name: &str, profile: &ScanProfile) {
    println!("{} {}", style("Scan profile:").bold(), style(name).cyan());
    println!("  Flags:       {}", profile.flags);
    println!("  Full sweep:  {}", profile.sweeps_all_ports());
}

pub fn print_enum_profile(name: &str, profile: &EnumProfile) {
    println!("{} {}", style("Enumeration profile:").bold(), style(name).cyan());
    println!("  Threads:     {}", profile.threads);
    println!("  Delay:       {}s", profile.delay);
    println!("  Extensions:  {}", profile.extensions);
}

/// Print the registry as a table.
pub fn print_registry(snapshot: &RegistrySnapshot) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(
        out,
        "  {:<8}  {:<20}  {:<8}  {:<24}  {}",
        style("ID").bold(),
        style("ADDRESS").bold(),
        style("SCOPE").bold(),
        style("OS/TECH").bold(),
        style("PORTS").bold()
    )?;
    writeln!(out, "  {}", style(THIN_RULE).dim())?;

    for target in &snapshot.targets {
        writeln!(
            out,
            "  {:<8}  {:<20}  {:<8}  {:<24}  {}",
            target.id,
            truncate_string(&target.address, 20),
            target.scope_status,
            truncate_string(&target.os_tech, 24),
            target.open_ports.join(LIST_SEPARATOR)
        )?;
    }

    if snapshot.skipped > 0 {
        writeln!(
            out,
            "  {}",
            style(format!("{} malformed row(s) not shown", snapshot.skipped)).dim()
        )?;
    }

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate a string to a maximum length in characters, adding an ellipsis.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
