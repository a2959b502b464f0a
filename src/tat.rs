//! Turnaround-time (TAT) computations.
//!
//! Every TAT decision in the system goes through these functions, with the
//! hour limit resolved from the case's form schema. The limit is never a
//! global constant: two schemas in the same organization can carry different
//! SLAs, and statistics, filtering, and write-time checks must all agree.

use chrono::{DateTime, Utc};

/// Hours between start and completion, or `None` for an open case.
///
/// The value is not clamped: a completion time earlier than the start time
/// yields a negative duration, which callers surface through
/// [`integrity_warning`] rather than hiding.
pub fn duration_hours(
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
) -> Option<f64> {
    completed_at.map(|done| (done - started_at).num_seconds() as f64 / 3600.0)
}

/// Whether a case has exceeded its schema's TAT limit.
///
/// Completed cases compare their fixed duration against the limit. Open
/// cases compare elapsed wall-clock time against the limit, so the answer
/// changes as `now` advances — callers must recompute at read time and must
/// not cache the boolean for incomplete cases.
pub fn is_out_of_tat(
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    limit_hours: i32,
) -> bool {
    let elapsed = match duration_hours(started_at, completed_at) {
        Some(hours) => hours,
        None => (now - started_at).num_seconds() as f64 / 3600.0,
    };
    elapsed > limit_hours as f64
}

/// Data-integrity warning for a completion time that precedes the start
/// time. Historical records may carry this; it is reported alongside the
/// record, never treated as a fatal error.
pub fn integrity_warning(
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
) -> Option<String> {
    match completed_at {
        Some(done) if done < started_at => Some(format!(
            "completion time {} precedes start time {}",
            done.to_rfc3339(),
            started_at.to_rfc3339()
        )),
        _ => None,
    }
}

/// Display status derived from the completion/verification flags.
/// Verification outranks completion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseStatus {
    Pending,
    Completed,
    Verified,
}

impl CaseStatus {
    pub fn derive(is_completed: bool, is_verified: bool) -> Self {
        if is_verified {
            CaseStatus::Verified
        } else if is_completed {
            CaseStatus::Completed
        } else {
            CaseStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Completed => "completed",
            CaseStatus::Verified => "verified",
        }
    }
}
