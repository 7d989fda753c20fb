//! CSV output formatting.

use crate::registry::{LIST_SEPARATOR, SCHEMA_HEADERS};
use crate::types::TargetRecord;
use std::io::{self, Write};

/// Print registry rows in CSV format.
pub fn print_registry_csv(targets: &[TargetRecord]) -> io::Result<()> {
    let stdout = io::stdout();
    write_registry_csv(stdout.lock(), targets)
}

fn write_registry_csv<W: Write>(writer: W, targets: &[TargetRecord]) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(&SCHEMA_HEADERS[..8])?;

    for target in targets {
        wtr.write_record([
            target.id.as_str(),
            target.label.as_str(),
            target.address.as_str(),
            target.scope_status.as_str(),
            target.reserved.as_str(),
            target.os_tech.as_str(),
            target.open_ports.join(LIST_SEPARATOR).as_str(),
            target.services.join(LIST_SEPARATOR).as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
