use std::collections::BTreeSet;

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::StayRange;

use super::EngineError;

// ── Availability Algorithm ────────────────────────────────────────

/// First blocked date intersecting the requested stay, if any.
///
/// Each blocked date is the degenerate interval `[b, b]`, so the general
/// interval-overlap law `a1 <= d2 && a2 <= d1` reduces to
/// `arrival <= b && b <= departure` — exactly the inclusive range query
/// below. If blocked ranges are ever stored as intervals instead of per-day
/// rows, only this function needs generalizing.
pub fn first_conflict(blocked: &BTreeSet<NaiveDate>, stay: &StayRange) -> Option<NaiveDate> {
    if stay.is_inverted() {
        return None;
    }
    blocked.range(stay.arrival..=stay.departure).next().copied()
}

/// True if the stay shares no day with the blocked set. Used by room search.
pub fn is_available(blocked: &BTreeSet<NaiveDate>, stay: &StayRange) -> bool {
    first_conflict(blocked, stay).is_none()
}

/// The inclusive day sequence `[arrival, arrival+1, ..., departure]`.
pub fn expand_dates(stay: &StayRange) -> Vec<NaiveDate> {
    stay.days().collect()
}

/// Decide whether `stay` can be booked for a room with the given blocked
/// set, and if so return every date that must be newly blocked.
///
/// Pure function of its inputs: no clock, no I/O. Future-date validation is
/// the caller's job; inverted ranges are rejected here as a last line of
/// defense.
pub fn check_and_expand(
    room_id: Ulid,
    blocked: &BTreeSet<NaiveDate>,
    stay: &StayRange,
) -> Result<Vec<NaiveDate>, EngineError> {
    if stay.is_inverted() {
        return Err(EngineError::InvalidDateRange {
            arrival: stay.arrival,
            departure: stay.departure,
        });
    }
    if let Some(date) = first_conflict(blocked, stay) {
        return Err(EngineError::DateConflict { room_id, date });
    }
    // Disjoint from the blocked set by the check above, so every expanded
    // date is genuinely new.
    Ok(expand_dates(stay))
}
