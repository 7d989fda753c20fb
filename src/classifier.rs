//! Port scanner output classification.
//!
//! Turns the raw text captured from the scanner into [`ScanFacts`]. This is a
//! pure function of its input so the parsing rules can be tested against
//! fixtures without spawning anything.

use crate::types::UNKNOWN_SERVICE;
use serde::Serialize;

/// Ports column value when no open port was found.
pub const NO_PORTS: &str = "FILTERED";

/// Services column value when no open port was found.
pub const NO_SERVICES: &str = "TBD";

/// OS/tech column value when no OS hint was found.
pub const DETECTION_FAILED: &str = "DETECTION_FAILED";

/// State and service token for TCP-wrapped ports.
pub const TCP_WRAPPED: &str = "tcpwrapped";

/// Markers that introduce an OS hint line.
const OS_HINT_MARKERS: [&str; 2] = ["OS details:", "Running:"];

/// Structured facts extracted from one scanner run.
///
/// `ports` and `services` always have the same length. When nothing was
/// found each holds a single sentinel ([`NO_PORTS`], [`NO_SERVICES`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFacts {
    pub ports: Vec<String>,
    pub services: Vec<String>,
    pub os_hint: Option<String>,
}

impl ScanFacts {
    /// Whether at least one open port line was seen.
    pub fn has_open_ports(&self) -> bool {
        !(self.ports.len() == 1 && self.ports[0] == NO_PORTS)
    }

    /// The OS hint, or [`DETECTION_FAILED`].
    pub fn os_tech(&self) -> String {
        self.os_hint
            .clone()
            .unwrap_or_else(|| DETECTION_FAILED.to_string())
    }
}

/// Classify combined scanner stdout/stderr.
pub fn classify(output: &str) -> ScanFacts {
    let mut ports = Vec::new();
    let mut services = Vec::new();
    let mut os_hint = None;

    for line in output.lines() {
        if let Some((port, service)) = parse_open_port(line) {
            ports.push(port);
            services.push(service);
        }

        if let Some(hint) = parse_os_hint(line) {
            // Last match wins.
            os_hint = Some(hint);
        }
    }

    if ports.is_empty() {
        ports.push(NO_PORTS.to_string());
        services.push(NO_SERVICES.to_string());
    }

    ScanFacts {
        ports,
        services,
        os_hint,
    }
}

/// Parse a line like `22/tcp open ssh` into `(port, service)`.
fn parse_open_port(line: &str) -> Option<(String, String)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 || !fields[0].contains("/tcp") {
        return None;
    }

    let state = fields[1];
    let is_open = state == "open"
        || state.starts_with("open|")
        || state == TCP_WRAPPED
        || fields.contains(&TCP_WRAPPED);
    if !is_open {
        return None;
    }

    let service = if state == TCP_WRAPPED {
        TCP_WRAPPED
    } else {
        fields.get(2).copied().unwrap_or(UNKNOWN_SERVICE)
    };

    Some((fields[0].to_string(), service.to_string()))
}

/// Extract the trimmed text after the first colon of an OS hint line.
///
/// Later colons stay in the hint, so `Running: Windows 10: 1607` keeps
/// `Windows 10: 1607` rather than only the segment before the second colon.
/// A marker line with nothing after the colon is ignored and does not blank
/// an earlier hint.
fn parse_os_hint(line: &str) -> Option<String> {
    if !OS_HINT_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }

    let (_, rest) = line.split_once(':')?;
    let hint = rest.trim();
    (!hint.is_empty()).then(|| hint.to_string())
}
