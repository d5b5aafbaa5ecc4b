// PRISM - core/parser.rs
//
// Header-driven parsing of Google Workspace email log search exports (CSV),
// plus first-seen-wins deduplication.
//
// `parse_reader` is the stateless core and accepts any `Read`. `parse_file`
// adds path handling. `LogCollection` is the caller-owned accumulator used
// when several exports feed one run.

use crate::core::model::{EventStatus, LogEntry};
use crate::util::constants::{self, *};
use crate::util::error::ParseError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use csv::StringRecord;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

// =============================================================================
// Column lookup
// =============================================================================

/// Maps header names to record positions. Columns may appear in any order;
/// if a header repeats, the first occurrence wins.
struct Columns {
    positions: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            positions.entry(name.to_string()).or_insert(idx);
        }
        Self { positions }
    }

    fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Raw cell text, or `None` when the column is absent or the row is short.
    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions.get(column).and_then(|&idx| record.get(idx))
    }

    /// Trimmed, non-empty cell text.
    fn text(&self, record: &StringRecord, column: &str) -> Option<String> {
        self.cell(record, column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Stateless parsing
// =============================================================================

/// Parse one export from any reader.
///
/// `source` is recorded on each entry and used in error messages. Rows whose
/// "Message ID" is missing or blank are skipped. Any malformed date or number
/// aborts the whole parse.
pub fn parse_reader<R: Read>(reader: R, source: &Path) -> Result<Vec<LogEntry>, ParseError> {
    let csv_error = |e: csv::Error| ParseError::Csv {
        file: source.to_path_buf(),
        source: e,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    let columns = Columns::from_headers(&headers);

    if !columns.has(COL_MESSAGE_ID) && !headers.is_empty() {
        tracing::warn!(
            file = %source.display(),
            column = COL_MESSAGE_ID,
            "Export has no message ID column; every row will be skipped"
        );
    }

    let mut entries = Vec::new();
    let mut skipped: usize = 0;

    for result in csv_reader.records() {
        let record = result.map_err(csv_error)?;
        match parse_record(&record, &columns, source)? {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
    }

    tracing::debug!(
        file = %source.display(),
        entries = entries.len(),
        skipped,
        "Export parsed"
    );

    Ok(entries)
}

/// Parse one export file from disk.
pub fn parse_file(path: &Path) -> Result<Vec<LogEntry>, ParseError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ParseError::FileNotFound {
            file: path.to_path_buf(),
        },
        _ => ParseError::Io {
            file: path.to_path_buf(),
            source: e,
        },
    })?;

    parse_reader(BufReader::new(file), path)
}

/// Build a `LogEntry` from one data row, or `None` if the row has no
/// message ID.
fn parse_record(
    record: &StringRecord,
    columns: &Columns,
    file: &Path,
) -> Result<Option<LogEntry>, ParseError> {
    let Some(message_id) = columns.text(record, COL_MESSAGE_ID) else {
        return Ok(None);
    };

    let line_number = record.position().map(|p| p.line()).unwrap_or(0);
    let row = RowContext {
        record,
        columns,
        file,
        line_number,
    };

    let (start_date, start_zone) = row.date(COL_START_DATE)?;
    let (end_date, end_zone) = row.date(COL_END_DATE)?;
    let message_size = row.number::<u64>(COL_MESSAGE_SIZE)?;
    let attachments = row.number::<u32>(COL_ATTACHMENTS)?;

    let encrypted = columns
        .cell(record, COL_HAS_ENCRYPTION)
        .is_some_and(|v| v == ENCRYPTED_MARKER);

    Ok(Some(LogEntry {
        message_id,
        sender: columns.cell(record, COL_SENDER).unwrap_or_default().to_string(),
        recipient: columns.cell(record, COL_RECIPIENT).unwrap_or_default().to_string(),
        start_date,
        end_date,
        start_zone,
        end_zone,
        message_size,
        attachments,
        encrypted,
        event_status: EventStatus::from_export(
            columns.cell(record, COL_EVENT_STATUS).unwrap_or_default(),
        ),
        subject: columns.text(record, COL_SUBJECT),
        direction: columns.text(record, COL_DIRECTION),
        event_target: columns.text(record, COL_EVENT_TARGET),
        event_date: columns.text(record, COL_EVENT_DATE),
        event_target_ip: columns.text(record, COL_EVENT_TARGET_IP),
        smtp_reply_code: columns.text(record, COL_SMTP_REPLY_CODE),
        event_description: columns.text(record, COL_EVENT_DESCRIPTION),
        client_type: columns.text(record, COL_CLIENT_TYPE),
        device_session_id: columns.text(record, COL_DEVICE_SESSION_ID),
        source_file: file.to_path_buf(),
        line_number,
    }))
}

/// Per-row view used to attach file/line context to field errors.
struct RowContext<'a> {
    record: &'a StringRecord,
    columns: &'a Columns,
    file: &'a Path,
    line_number: u64,
}

impl RowContext<'_> {
    fn date(&self, column: &'static str) -> Result<(DateTime<FixedOffset>, String), ParseError> {
        let raw = self
            .columns
            .text(self.record, column)
            .ok_or_else(|| ParseError::MissingDate {
                file: self.file.to_path_buf(),
                line_number: self.line_number,
                column,
            })?;

        parse_zoned_timestamp(&raw).map_err(|reason| ParseError::InvalidDate {
            file: self.file.to_path_buf(),
            line_number: self.line_number,
            column,
            raw,
            reason,
        })
    }

    /// Empty or absent cells count as zero.
    fn number<T>(&self, column: &'static str) -> Result<T, ParseError>
    where
        T: std::str::FromStr + Default,
    {
        match self.columns.text(self.record, column) {
            None => Ok(T::default()),
            Some(raw) => raw.parse::<T>().map_err(|_| ParseError::InvalidNumber {
                file: self.file.to_path_buf(),
                line_number: self.line_number,
                column,
                raw,
            }),
        }
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parse an export timestamp of the form `YYYY/MM/DD hh:mm:ss ZONE`.
///
/// The zone must be one of the abbreviations the export is known to emit;
/// it is resolved to a fixed UTC offset so that entries from different
/// zones compare by instant.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    parse_zoned_timestamp(raw).map(|(ts, _)| ts)
}

/// As `parse_timestamp`, also returning the zone abbreviation as written.
pub fn parse_zoned_timestamp(raw: &str) -> Result<(DateTime<FixedOffset>, String), String> {
    let trimmed = raw.trim();

    let (date_time, zone) = trimmed
        .rsplit_once(' ')
        .ok_or_else(|| format!("expected {}", constants::EXPORT_DATE_LAYOUT))?;

    let naive = NaiveDateTime::parse_from_str(date_time.trim_end(), EXPORT_DATE_FORMAT)
        .map_err(|e| format!("expected {}: {e}", constants::EXPORT_DATE_LAYOUT))?;

    let offset = zone_offset(zone).ok_or_else(|| format!("unknown time zone '{zone}'"))?;

    let ts = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("'{trimmed}' does not map to a single instant"))?;

    Ok((ts, zone.to_string()))
}

/// Fixed offset for a zone abbreviation, or `None` if it is not recognised.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours: i32 = match zone {
        "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        "AKST" => -9,
        "AKDT" => -8,
        "HST" => -10,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

// =============================================================================
// Deduplication
// =============================================================================

/// Keep the first entry for each (message ID, recipient) pair, in
/// first-seen order.
pub fn deduplicate(entries: &[LogEntry]) -> Vec<LogEntry> {
    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .filter(|entry| seen.insert(entry.dedup_key()))
        .cloned()
        .collect()
}

// =============================================================================
// Accumulator
// =============================================================================

/// Entries gathered from one or more exports during a single run.
///
/// There is no reset: every successful `parse` appends, and
/// `entries` always returns everything loaded so far (duplicates included)
/// in file-then-row order. Not intended for shared use across threads.
#[derive(Debug, Default)]
pub struct LogCollection {
    entries: Vec<LogEntry>,
    files: Vec<PathBuf>,
}

impl LogCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` and append its entries. Returns the entries just added.
    ///
    /// On error nothing is appended.
    pub fn parse(&mut self, path: &Path) -> Result<&[LogEntry], ParseError> {
        let parsed = parse_file(path)?;
        let start = self.entries.len();
        self.entries.extend(parsed);
        self.files.push(path.to_path_buf());

        tracing::info!(
            file = %path.display(),
            added = self.entries.len() - start,
            total = self.entries.len(),
            "Loaded export"
        );

        Ok(&self.entries[start..])
    }

    /// Parse every path in order and append the combined result.
    ///
    /// All-or-nothing: the first failing file aborts the call with its
    /// error and none of the files in this call are appended.
    pub fn parse_multiple<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
    ) -> Result<&[LogEntry], ParseError> {
        let mut batch = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let parsed = parse_file(path)?;
            tracing::debug!(file = %path.display(), entries = parsed.len(), "Export staged");
            batch.push((path.to_path_buf(), parsed));
        }

        let start = self.entries.len();
        for (path, parsed) in batch {
            self.entries.extend(parsed);
            self.files.push(path);
        }

        tracing::info!(
            files = paths.len(),
            added = self.entries.len() - start,
            total = self.entries.len(),
            "Loaded exports"
        );

        Ok(&self.entries[start..])
    }

    /// First-seen-wins copy of the loaded entries. The stored entries are
    /// left untouched and remain available through `entries`.
    pub fn deduplicate(&self) -> Vec<LogEntry> {
        let unique = deduplicate(&self.entries);
        tracing::debug!(
            before = self.entries.len(),
            after = unique.len(),
            "Removed duplicate message/recipient rows"
        );
        unique
    }

    /// Every entry loaded so far, including duplicates.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Files successfully loaded, in load order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
