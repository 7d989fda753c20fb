//! JSON output formatting.

use serde::Serialize;
use std::io;

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScopeStatus, TargetRecord};

    #[test]
    fn test_target_json() {
        let mut record = TargetRecord::new("TR-001", "10.0.0.5");
        record.scope_status = ScopeStatus::Active;
        record.open_ports = vec!["22/tcp".to_string()];

        let json: serde_json::Value = serde_json::from_str(&to_json(&[record]).unwrap()).unwrap();
        assert_eq!(json[0]["id"], "TR-001");
        assert_eq!(json[0]["scope_status"], "ACTIVE");
        assert_eq!(json[0]["open_ports"][0], "22/tcp");
    }
}
