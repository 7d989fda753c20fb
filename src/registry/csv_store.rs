//! CSV-backed target registry.
//!
//! The registry file is the single source of truth shared by every task in a
//! run. Each write replaces the whole file, so [`RegistryStore`] serializes all
//! read-modify-write cycles behind one async mutex: two tasks finishing at the
//! same moment both land their rows instead of the later write silently
//! discarding the earlier one.
//!
//! Writes splice bytes rather than re-encoding the table. An upsert replaces
//! only the matched row's text and an append only adds lines, so quoting, line
//! endings and blank lines elsewhere in the file survive untouched.

use crate::error::{RegistryError, RegistryResult};
use crate::types::{ScopeStatus, TargetRecord};
use csv::{StringRecord, Terminator};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    COL_ADDRESS, COL_ID, COL_LABEL, COL_OS_TECH, COL_PORTS, COL_RESERVED, COL_SCOPE,
    COL_SERVICES, LIST_SEPARATOR, MIN_FIELDS, SCHEMA_HEADERS,
};

/// Fields a scan writes back into a target's row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryUpdate {
    pub scope_status: ScopeStatus,
    pub os_tech: String,
    pub open_ports: Vec<String>,
    pub services: Vec<String>,
}

/// Targets read from the registry, in file order.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub targets: Vec<TargetRecord>,
    /// Data rows dropped as malformed.
    pub skipped: usize,
}

/// File-backed registry with single-writer discipline.
///
/// Share one instance (behind an `Arc`) between all tasks of a run.
pub struct RegistryStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl RegistryStore {
    /// Open a registry at `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Create a registry holding only the header row.
    pub async fn create(path: impl Into<PathBuf>, force: bool) -> RegistryResult<Self> {
        let store = Self::new(path);
        if tokio::fs::try_exists(&store.path).await.unwrap_or(false) && !force {
            return Err(RegistryError::AlreadyExists(store.path.clone()));
        }

        let _guard = store.writer.lock().await;
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| store.write_error(e))?;
        }
        let header = store.encode_rows(
            &[StringRecord::from(SCHEMA_HEADERS.to_vec())],
            Terminator::Any(b'\n'),
        )?;
        store.write_bytes(&header).await?;
        drop(_guard);

        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed target row.
    pub async fn load_targets(&self) -> RegistryResult<RegistrySnapshot> {
        let rows = parse_rows(&self.read_bytes().await?)?;
        let mut snapshot = RegistrySnapshot::default();

        for row in rows.iter().skip(1) {
            match record_from_row(row) {
                Some(record) => snapshot.targets.push(record),
                None => {
                    debug!(row = ?row, "skipping malformed registry row");
                    snapshot.skipped += 1;
                }
            }
        }

        Ok(snapshot)
    }

    /// Overwrite the scan columns of the row whose ID is `id`.
    ///
    /// Only the matched row's text is rewritten; every other byte of the file
    /// is kept as is. Fails with [`RegistryError::NotFound`] without touching
    /// the file when no row matches.
    pub async fn upsert(&self, id: &str, update: &RegistryUpdate) -> RegistryResult<()> {
        let _guard = self.writer.lock().await;

        let data = self.read_bytes().await?;
        let (span, row) =
            locate_row(&data, id)?.ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let encoded = self.encode_rows(&[apply_update(&row, update)], Terminator::Any(b'\n'))?;
        let line = encoded.strip_suffix(&b"\n"[..]).unwrap_or(&encoded);

        let mut out = Vec::with_capacity(data.len() + line.len());
        out.extend_from_slice(&data[..span.start]);
        out.extend_from_slice(line);
        out.extend_from_slice(&data[span.end..]);

        self.write_bytes(&out).await
    }

    /// Append one `PENDING` row per address and return the new IDs.
    ///
    /// IDs continue the `TR-NNN` sequence from the current row count,
    /// skipping any already taken.
    pub async fn append(&self, addresses: &[String]) -> RegistryResult<Vec<String>> {
        let _guard = self.writer.lock().await;

        let mut data = self.read_bytes().await?;
        let terminator = detect_terminator(&data);
        let mut rows = parse_rows(&data)?;
        let mut fresh = Vec::with_capacity(addresses.len() + 1);
        if rows.is_empty() {
            let header = StringRecord::from(SCHEMA_HEADERS.to_vec());
            rows.push(header.clone());
            fresh.push(header);
        }

        let width = rows[0].len().max(COL_SERVICES + 1);
        let mut next = rows.len();
        let mut ids = Vec::with_capacity(addresses.len());

        for (i, address) in addresses.iter().enumerate() {
            let id = loop {
                let candidate = format!("TR-{:03}", next);
                next += 1;
                if !rows.iter().any(|row| row.get(COL_ID) == Some(candidate.as_str())) {
                    break candidate;
                }
            };

            let mut fields = vec!["TBD".to_string(); width];
            fields[COL_ID] = id.clone();
            fields[COL_LABEL] = format!("T_{}", i);
            fields[COL_ADDRESS] = address.clone();
            fields[COL_SCOPE] = ScopeStatus::Pending.to_string();

            let row = StringRecord::from(fields);
            rows.push(row.clone());
            fresh.push(row);
            ids.push(id);
        }

        if !data.is_empty() && !data.ends_with(b"\n") && !data.ends_with(b"\r") {
            data.extend_from_slice(terminator_bytes(terminator));
        }
        data.extend_from_slice(&self.encode_rows(&fresh, terminator)?);

        self.write_bytes(&data).await?;
        Ok(ids)
    }

    async fn read_bytes(&self) -> RegistryResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| RegistryError::ReadFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn encode_rows(&self, rows: &[StringRecord], terminator: Terminator) -> RegistryResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(terminator)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record(row)?;
        }
        writer.into_inner().map_err(|e| RegistryError::WriteFailed {
            path: self.path.clone(),
            reason: e.error().to_string(),
        })
    }

    /// Write to a sibling temp file, then rename it into place.
    async fn write_bytes(&self, data: &[u8]) -> RegistryResult<()> {
        let tmp = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            return Err(self.write_error(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "registry.csv".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    fn write_error(&self, e: std::io::Error) -> RegistryError {
        RegistryError::WriteFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

fn parse_rows(data: &[u8]) -> RegistryResult<Vec<StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Find the first data row whose ID is `id`, with the byte span of its text.
///
/// The span excludes line terminators and any blank lines before the row.
fn locate_row(data: &[u8], id: &str) -> RegistryResult<Option<(Range<usize>, StringRecord)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut record = StringRecord::new();
    let mut is_header = true;

    loop {
        let start = reader.position().byte() as usize;
        if !reader.read_record(&mut record)? {
            return Ok(None);
        }
        if !is_header && record.get(COL_ID) == Some(id) {
            let end = reader.position().byte() as usize;
            return Ok(Some((trim_line(data, start, end), record)));
        }
        is_header = false;
    }
}

fn trim_line(data: &[u8], mut start: usize, mut end: usize) -> Range<usize> {
    while start < end && matches!(data[start], b'\r' | b'\n') {
        start += 1;
    }
    while end > start && matches!(data[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    start..end
}

/// CRLF if the file already uses it, LF otherwise.
fn detect_terminator(data: &[u8]) -> Terminator {
    if data.windows(2).any(|pair| pair == b"\r\n") {
        Terminator::CRLF
    } else {
        Terminator::Any(b'\n')
    }
}

fn terminator_bytes(terminator: Terminator) -> &'static [u8] {
    match terminator {
        Terminator::CRLF => b"\r\n",
        _ => b"\n",
    }
}

/// Build a record from a data row, or `None` if the row is malformed.
fn record_from_row(row: &StringRecord) -> Option<TargetRecord> {
    if row.len() < MIN_FIELDS {
        return None;
    }

    let field = |i: usize| row.get(i).unwrap_or("").to_string();
    let id = field(COL_ID);
    let address = field(COL_ADDRESS);
    if id.trim().is_empty() || address.trim().is_empty() {
        return None;
    }

    Some(TargetRecord {
        id,
        label: field(COL_LABEL),
        address: address.trim().to_string(),
        scope_status: ScopeStatus::from(row.get(COL_SCOPE).unwrap_or("")),
        reserved: field(COL_RESERVED),
        os_tech: field(COL_OS_TECH),
        open_ports: split_list(row.get(COL_PORTS).unwrap_or("")),
        services: split_list(row.get(COL_SERVICES).unwrap_or("")),
    })
}

fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(LIST_SEPARATOR).map(str::to_string).collect()
}

/// Copy `row`, padding it to the scan columns and overwriting them.
fn apply_update(row: &StringRecord, update: &RegistryUpdate) -> StringRecord {
    let mut fields: Vec<String> = row.iter().map(str::to_string).collect();
    if fields.len() <= COL_SERVICES {
        fields.resize(COL_SERVICES + 1, String::new());
    }

    fields[COL_SCOPE] = update.scope_status.to_string();
    fields[COL_OS_TECH] = update.os_tech.clone();
    fields[COL_PORTS] = update.open_ports.join(LIST_SEPARATOR);
    fields[COL_SERVICES] = update.services.join(LIST_SEPARATOR);

    StringRecord::from(fields)
}
