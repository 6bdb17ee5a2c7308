// src/conflict.rs

//! Time-overlap detection between a proposed appointment and the agenda.
//!
//! Intervals are half-open `[start, end)`: an appointment ending at 10:00 and
//! one starting at 10:00 do not conflict.

use serde::Serialize;

use crate::models::Appointment;

/// Overlaps of at least this many minutes are reported as large.
pub const LARGE_OVERLAP_MINUTES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    ExactSlot,
    LargeOverlap,
    Overlapping,
}

impl ConflictSeverity {
    pub fn is_partial(self) -> bool {
        self != ConflictSeverity::ExactSlot
    }
}

/// Existing appointment that blocks the proposed one, with the explanation
/// shown in the override dialog. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub existing: Appointment,
    pub proposed: Appointment,
    pub overlap_minutes: u64,
    pub severity: ConflictSeverity,
    pub message: String,
}

/// Length of the intersection of two half-open intervals (0 when disjoint).
pub fn overlap_minutes(a: (u64, u64), b: (u64, u64)) -> u64 {
    a.1.min(b.1).saturating_sub(a.0.max(b.0))
}

fn classify(proposed: (u64, u64), existing: (u64, u64), overlap: u64) -> ConflictSeverity {
    if proposed == existing {
        ConflictSeverity::ExactSlot
    } else if overlap >= LARGE_OVERLAP_MINUTES {
        ConflictSeverity::LargeOverlap
    } else {
        ConflictSeverity::Overlapping
    }
}

fn describe(existing: &Appointment, severity: ConflictSeverity, overlap: u64) -> String {
    let slot = format!(
        "{} {}-{}",
        existing.date.format("%Y-%m-%d"),
        existing.start_time,
        existing.end_time().unwrap_or_else(|_| "?".into())
    );
    match severity {
        ConflictSeverity::ExactSlot => {
            format!("Exact same slot as an existing appointment ({slot})")
        }
        ConflictSeverity::LargeOverlap => {
            format!("Large overlap, {overlap} minutes, with an existing appointment ({slot})")
        }
        ConflictSeverity::Overlapping => {
            format!("Overlapping schedules with an existing appointment ({slot})")
        }
    }
}

/// First existing appointment that overlaps `candidate`, scanning in input order.
///
/// Skipped: other dates, cancelled appointments, `exclude_id` (the
/// appointment being edited), and records whose start time is unreadable.
/// A cancelled candidate never conflicts. Pure; no I/O.
pub fn detect_conflict(
    candidate: &Appointment,
    existing: &[Appointment],
    exclude_id: Option<&str>,
) -> Option<ConflictRecord> {
    if candidate.is_cancelled() {
        return None;
    }
    let proposed = match candidate.interval() {
        Ok(iv) => iv,
        Err(e) => {
            tracing::debug!(error = %e, "candidate has no readable interval");
            return None;
        }
    };

    existing
        .iter()
        .filter(|other| other.date == candidate.date)
        .filter(|other| !other.is_cancelled())
        .filter(|other| exclude_id != Some(other.id.as_str()))
        .find_map(|other| {
            let theirs = other.interval().ok()?;
            let overlap = overlap_minutes(proposed, theirs);
            if overlap == 0 {
                return None;
            }
            let severity = classify(proposed, theirs, overlap);
            Some(ConflictRecord {
                message: describe(other, severity, overlap),
                existing: other.clone(),
                proposed: candidate.clone(),
                overlap_minutes: overlap,
                severity,
            })
        })
}
