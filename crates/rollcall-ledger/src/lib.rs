//! rollcall-ledger — Durable attendance record store.
//!
//! One CSV file, one row per (person, day): `Name, Date, Punch In, Punch Out`.
//! All fields are text; an absent punch-out is an empty string on disk.
//! `record_event` is the single idempotent mutation: a full read-modify-rewrite
//! per call, safe because the presence tracker drives it sequentially from a
//! single frame loop.

use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{AttendanceRecord, EventKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";
const HEADERS: [&str; 4] = ["Name", "Date", "Punch In", "Punch Out"];

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger io: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger file malformed: {0}")]
    Malformed(#[from] csv::Error),
    #[error("invalid date in ledger row: {0:?}")]
    InvalidDate(String),
}

/// On-disk row shape. Kept separate from [`AttendanceRecord`] so that
/// empty-value normalization lives here and nowhere else.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Punch In")]
    punch_in: String,
    #[serde(rename = "Punch Out")]
    punch_out: String,
}

/// Normalize the textual empty-value zoo to `None`.
///
/// Files written by other tools may carry "nan" or "null" literals where
/// this writer would leave an empty string; all of them mean "not punched
/// out yet".
fn normalize_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Row {
    fn into_record(self) -> Result<AttendanceRecord, LedgerError> {
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FMT)
            .map_err(|_| LedgerError::InvalidDate(self.date.clone()))?;
        Ok(AttendanceRecord {
            person: self.name,
            date,
            punch_in: self.punch_in.trim().to_string(),
            punch_out: normalize_empty(&self.punch_out),
        })
    }

    fn from_record(record: &AttendanceRecord) -> Self {
        Self {
            name: record.person.clone(),
            date: record.date.format(DATE_FMT).to_string(),
            punch_in: record.punch_in.clone(),
            punch_out: record.punch_out.clone().unwrap_or_default(),
        }
    }
}

/// Attendance ledger over a CSV file.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a sighting of `person` at `now`.
    ///
    /// - no row for (person, today): create it with the punch-in time set and
    ///   an empty punch-out → [`EventKind::PunchIn`];
    /// - row exists with an empty punch-out: fill the punch-out time, punch-in
    ///   untouched → [`EventKind::PunchOut`];
    /// - both times set: no mutation → [`EventKind::AlreadyMarked`].
    pub fn record_event(
        &mut self,
        person: &str,
        now: NaiveDateTime,
    ) -> Result<EventKind, LedgerError> {
        let today = now.date();
        let time = now.format(TIME_FMT).to_string();

        self.ensure_store()?;
        let mut records = self.records()?;

        let existing = records
            .iter_mut()
            .find(|r| r.person == person && r.date == today);

        let kind = match existing {
            None => {
                records.push(AttendanceRecord {
                    person: person.to_string(),
                    date: today,
                    punch_in: time.clone(),
                    punch_out: None,
                });
                EventKind::PunchIn
            }
            Some(record) if record.punch_out.is_none() => {
                record.punch_out = Some(time.clone());
                EventKind::PunchOut
            }
            Some(record) => {
                tracing::debug!(
                    person = %person,
                    punch_in = %record.punch_in,
                    punch_out = record.punch_out.as_deref(),
                    "already marked for today"
                );
                return Ok(EventKind::AlreadyMarked);
            }
        };

        self.write_all(&records)?;
        tracing::info!(person = %person, time = %time, event = %kind, "ledger updated");
        Ok(kind)
    }

    /// All records in file order. A missing file reads as an empty set.
    pub fn records(&self) -> Result<Vec<AttendanceRecord>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<Row>() {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Records for one calendar day, for reconciliation and reporting.
    pub fn records_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, LedgerError> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.date == date)
            .collect())
    }

    /// Create the backing file with a header row if it does not exist yet.
    fn ensure_store(&self) -> Result<(), LedgerError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(HEADERS)?;
        writer.flush()?;
        tracing::info!(path = %self.path.display(), "created attendance ledger");
        Ok(())
    }

    /// Rewrite the whole file. Acceptable at attendance scale; a keyed store
    /// or append-only log would replace this if the ledger grew large.
    ///
    /// Writes go to a sibling temp file which is then renamed over the
    /// original, so a crash mid-rewrite cannot truncate existing records.
    fn write_all(&self, records: &[AttendanceRecord]) -> Result<(), LedgerError> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in records {
                writer.serialize(Row::from_record(record))?;
            }
            if records.is_empty() {
                writer.write_record(HEADERS)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
