//! Lazy CSV roster reader.
//!
//! The roster's header row uses the source locale's labels (Thai by default);
//! the English field keys are always accepted as aliases. Every field is
//! trimmed. Rows without a first and last name are skipped, rows the CSV
//! decoder rejects are skipped with a warning, and an I/O failure ends the
//! read with [`IngestError::Io`].

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

use crate::error::{io_err, IngestError};
use crate::types::RosterRecord;

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

/// A named column of the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosterField {
    FullName,
    Prefix,
    FirstName,
    LastName,
    Nickname,
    Status,
}

impl RosterField {
    pub const ALL: [RosterField; 6] = [
        RosterField::FullName,
        RosterField::Prefix,
        RosterField::FirstName,
        RosterField::LastName,
        RosterField::Nickname,
        RosterField::Status,
    ];

    /// Locale-independent key, always accepted as a header alias.
    pub fn key(self) -> &'static str {
        match self {
            RosterField::FullName => "fullName",
            RosterField::Prefix => "prefix",
            RosterField::FirstName => "firstName",
            RosterField::LastName => "lastName",
            RosterField::Nickname => "nickname",
            RosterField::Status => "status",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Binds header labels to roster fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    labels: Vec<(RosterField, String)>,
}

impl Default for HeaderMap {
    fn default() -> Self {
        Self::thai()
    }
}

impl HeaderMap {
    /// The labels of the accepted-participant export.
    pub fn thai() -> Self {
        Self {
            labels: vec![
                (RosterField::FullName, "รายชื่อ".to_string()),
                (RosterField::Prefix, "คำนำหน้า".to_string()),
                (RosterField::FirstName, "ชื่อจริง".to_string()),
                (RosterField::LastName, "นามสกุล".to_string()),
                (RosterField::Nickname, "ชื่อเล่น".to_string()),
                (RosterField::Status, "สถานะ".to_string()),
            ],
        }
    }

    /// Add another accepted label for `field`.
    pub fn with_label(mut self, field: RosterField, label: impl Into<String>) -> Self {
        self.labels.push((field, label.into()));
        self
    }

    fn matches(&self, field: RosterField, header: &str) -> bool {
        header == field.key()
            || self
                .labels
                .iter()
                .any(|(f, label)| *f == field && label == header)
    }

    fn resolve(&self, headers: &StringRecord) -> Columns {
        let mut columns = Columns::default();
        for (position, raw) in headers.iter().enumerate() {
            let header = raw.trim_start_matches('\u{feff}').trim();
            for field in RosterField::ALL {
                if columns.0[field.index()].is_none() && self.matches(field, header) {
                    columns.0[field.index()] = Some(position);
                }
            }
        }
        columns
    }
}

/// Column position per field, `None` when the header lacks it.
#[derive(Debug, Clone, Copy, Default)]
struct Columns([Option<usize>; 6]);

impl Columns {
    fn get<'r>(&self, record: &'r StringRecord, field: RosterField) -> &'r str {
        self.0[field.index()]
            .and_then(|position| record.get(position))
            .map(str::trim)
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// A single-pass iterator of accepted roster records.
pub struct RosterReader<R> {
    rows: StringRecordsIntoIter<R>,
    columns: Columns,
    source: PathBuf,
    row: usize,
    accepted: usize,
    skipped: usize,
}

impl RosterReader<File> {
    /// Open a roster file. A missing file is [`IngestError::NotFound`].
    pub fn from_path(path: &Path, headers: HeaderMap) -> Result<Self, IngestError> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                IngestError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                io_err(path, e)
            }
        })?;
        Self::from_reader(file, path, headers)
    }
}

impl<R: Read> RosterReader<R> {
    /// Wrap any reader. `source` labels errors and logs.
    pub fn from_reader(
        reader: R,
        source: impl Into<PathBuf>,
        headers: HeaderMap,
    ) -> Result<Self, IngestError> {
        let source = source.into();
        let mut csv = ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let header_row = csv.headers().map_err(|e| header_err(&source, e))?.clone();
        let columns = headers.resolve(&header_row);
        for field in [RosterField::FirstName, RosterField::LastName] {
            if columns.0[field.index()].is_none() {
                tracing::warn!(
                    source = %source.display(),
                    field = field.key(),
                    "roster header has no column for required field; every row will be skipped",
                );
            }
        }

        Ok(Self {
            rows: csv.into_records(),
            columns,
            source,
            row: 0,
            accepted: 0,
            skipped: 0,
        })
    }

    /// Records yielded so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Rows skipped so far (incomplete or undecodable).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn build(&self, raw: &StringRecord) -> RosterRecord {
        let field = |f| self.columns.get(raw, f).to_string();
        RosterRecord {
            row: self.row,
            full_name: field(RosterField::FullName),
            prefix: field(RosterField::Prefix),
            first_name: field(RosterField::FirstName),
            last_name: field(RosterField::LastName),
            nickname: field(RosterField::Nickname),
            status: field(RosterField::Status),
        }
    }
}

impl<R: Read> Iterator for RosterReader<R> {
    type Item = Result<RosterRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.rows.next()?;
            self.row += 1;

            let raw = match next {
                Ok(raw) => raw,
                Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                    return Some(Err(io_err(&self.source, io::Error::from(err))));
                }
                Err(err) => {
                    tracing::warn!(row = self.row, error = %err, "skipping undecodable roster row");
                    self.skipped += 1;
                    continue;
                }
            };

            let record = self.build(&raw);
            if record.first_name.is_empty() || record.last_name.is_empty() {
                tracing::debug!(row = self.row, "skipping roster row without first and last name");
                self.skipped += 1;
                continue;
            }

            self.accepted += 1;
            return Some(Ok(record));
        }
    }
}

/// Read the whole roster at `path` into memory.
///
/// Any I/O failure aborts the read; no partial roster is returned.
pub fn read_roster(path: &Path, headers: HeaderMap) -> Result<Vec<RosterRecord>, IngestError> {
    let mut reader = RosterReader::from_path(path, headers)?;
    let records = reader.by_ref().collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        source = %path.display(),
        accepted = reader.accepted(),
        skipped = reader.skipped(),
        "roster processed",
    );
    Ok(records)
}

fn header_err(source: &Path, err: csv::Error) -> IngestError {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        io_err(source, io::Error::from(err))
    } else {
        IngestError::Header {
            path: source.to_path_buf(),
            source: err,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
