use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face embedding vector (dimensionality fixed by the detection model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// A dimension mismatch means one of the vectors is malformed and the
    /// comparison is meaningless, so it is an error rather than a silent
    /// truncation.
    pub fn euclidean_distance(&self, other: &Embedding) -> Result<f32, EmbeddingError> {
        if self.values.len() != other.values.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: other.values.len(),
                actual: self.values.len(),
            });
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }
}

/// One face reported by the detection model for a frame: where it is and
/// what it looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub region: BoundingBox,
    pub embedding: Embedding,
}

/// Outcome of recording a sighting in the attendance ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First sighting of the person today; a new record was created.
    PunchIn,
    /// The person returned after leaving; punch-out time was filled.
    PunchOut,
    /// Both times already set for today; nothing was written.
    AlreadyMarked,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::PunchIn => "PUNCH IN",
            EventKind::PunchOut => "PUNCH OUT",
            EventKind::AlreadyMarked => "ALREADY MARKED",
        })
    }
}

/// UI-facing label for a person in the current frame. Derived from presence
/// state, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    PunchIn,
    PunchOut,
    AlreadyMarked,
    /// Punched in and still visible; lingering in frame records nothing.
    InFrame,
    /// Punched out; attendance is complete for the rest of the day.
    AttendanceComplete,
}

impl From<EventKind> for DisplayStatus {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::PunchIn => DisplayStatus::PunchIn,
            EventKind::PunchOut => DisplayStatus::PunchOut,
            EventKind::AlreadyMarked => DisplayStatus::AlreadyMarked,
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DisplayStatus::PunchIn => "PUNCH IN",
            DisplayStatus::PunchOut => "PUNCH OUT",
            DisplayStatus::AlreadyMarked => "ALREADY MARKED",
            DisplayStatus::InFrame => "IN FRAME",
            DisplayStatus::AttendanceComplete => "ATTENDANCE COMPLETE",
        })
    }
}

/// One per-person-per-day attendance record.
///
/// Unique key is (person, date). Created on the first sighting of a day,
/// mutated once to fill `punch_out`, never deleted. Times are wall-clock
/// text (`HH:MM:SS`); emptiness of the punch-out is normalized by the
/// storage adapter, so an absent punch-out is always `None` here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub person: String,
    pub date: NaiveDate,
    pub punch_in: String,
    pub punch_out: Option<String>,
}
