//! Presence state machine — per-identity tracking of punch-in/punch-out.
//!
//! Drives the attendance ledger: the first sighting of a person punches in,
//! a sighting after they left the frame punches out, and after that the day
//! is complete. The tracker owns all mutable state (no globals), so multiple
//! independent trackers can coexist and tests stay deterministic.

use crate::types::{AttendanceRecord, DisplayStatus, EventKind};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Per-person presence state. An identity with no entry is NOT_SEEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// Sighted today and still (or last known to be) in frame.
    PunchedIn,
    /// Was punched in, then absent from a frame; next sighting punches out.
    Left,
    /// Punched out. Terminal for the rest of the day: no further ledger calls.
    PunchedOut,
}

/// Tracks presence per identity across frames and decides when a sighting
/// must be recorded in the ledger.
#[derive(Default)]
pub struct PresenceTracker {
    state: HashMap<String, PresenceState>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a person, if they have been seen (or reconciled).
    pub fn state_of(&self, person: &str) -> Option<PresenceState> {
        self.state.get(person).copied()
    }

    /// Seed state from today's persisted ledger rows, so a restarted process
    /// does not re-attempt punch-ins for people already recorded today.
    ///
    /// A row with only a punch-in means the person was present earlier; they
    /// start as `Left`, and their next sighting punches out. A row with both
    /// times starts as `PunchedOut`.
    pub fn reconcile<'a>(
        &mut self,
        today: NaiveDate,
        records: impl IntoIterator<Item = &'a AttendanceRecord>,
    ) {
        for record in records {
            if record.date != today {
                continue;
            }
            let state = if record.punch_out.is_some() {
                PresenceState::PunchedOut
            } else {
                PresenceState::Left
            };
            tracing::info!(person = %record.person, state = ?state, "reconciled from ledger");
            self.state.insert(record.person.clone(), state);
        }
    }

    /// Apply one frame's worth of sightings.
    ///
    /// `detected` is the frame's full set of resolved identities (unknown
    /// detections excluded). `record` is the ledger hook, invoked at most
    /// once per identity per frame; its error aborts the frame and leaves
    /// the identity's state untouched, so the next frame retries.
    ///
    /// Returns a display status for every detected identity. The leave pass
    /// runs after all sightings are applied, against the frame's full
    /// detected-set snapshot, so a person seen this frame is never
    /// simultaneously marked as having left.
    pub fn on_frame<E>(
        &mut self,
        detected: &HashSet<String>,
        mut record: impl FnMut(&str) -> Result<EventKind, E>,
    ) -> Result<HashMap<String, DisplayStatus>, E> {
        let mut statuses = HashMap::with_capacity(detected.len());

        for person in detected {
            let status = match self.state.get(person) {
                // First sighting today: punch in.
                None => {
                    let kind = record(person)?;
                    self.state.insert(person.clone(), PresenceState::PunchedIn);
                    tracing::info!(person = %person, event = %kind, "recorded");
                    DisplayStatus::from(kind)
                }
                // Returned after leaving: punch out.
                Some(PresenceState::Left) => {
                    let kind = record(person)?;
                    self.state.insert(person.clone(), PresenceState::PunchedOut);
                    tracing::info!(person = %person, event = %kind, "recorded");
                    DisplayStatus::from(kind)
                }
                // Lingering in frame records nothing.
                Some(PresenceState::PunchedIn) => DisplayStatus::InFrame,
                Some(PresenceState::PunchedOut) => DisplayStatus::AttendanceComplete,
            };
            statuses.insert(person.clone(), status);
        }

        for (person, state) in self.state.iter_mut() {
            if *state == PresenceState::PunchedIn && !detected.contains(person) {
                *state = PresenceState::Left;
                tracing::info!(person = %person, "left the frame, will punch out on return");
            }
        }

        Ok(statuses)
    }
}
