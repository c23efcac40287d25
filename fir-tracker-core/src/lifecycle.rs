//! Investigation lifecycle engine
//!
//! Derives `days_elapsed`, `status` and `quality` from a case's FIR date,
//! charge-sheet date and completion flag. Everything here is pure: the
//! current instant is passed in by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Case, CaseQuality, CaseStatus};

/// Upper bound (inclusive) of the first age bucket
pub const ON_TRACK_MAX_DAYS: u32 = 30;
/// Upper bound (inclusive) of the second age bucket
pub const CRITICAL_MAX_DAYS: u32 = 60;

/// The fields the engine owns on a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derived {
    pub days_elapsed: u32,
    pub status: CaseStatus,
    pub quality: CaseQuality,
}

impl Case {
    pub fn derived(&self) -> Derived {
        Derived {
            days_elapsed: self.days_elapsed,
            status: self.status,
            quality: self.quality,
        }
    }

    pub fn set_derived(&mut self, derived: Derived) {
        self.days_elapsed = derived.days_elapsed;
        self.status = derived.status;
        self.quality = derived.quality;
    }

    /// Recompute the derived fields in place
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        if let Some(derived) = derive(self, now) {
            self.set_derived(derived);
        }
    }
}

/// Compute derived state, or `None` when the case has no FIR date and
/// therefore cannot be aged.
pub fn derive(case: &Case, now: DateTime<Utc>) -> Option<Derived> {
    let fir_date = case.fir_date?;
    let reference = if case.is_completed {
        case.cc_date.unwrap_or(now)
    } else {
        now
    };
    let days_elapsed = whole_days_between(fir_date, reference);

    let derived = if case.is_completed {
        Derived {
            days_elapsed,
            status: CaseStatus::Completed,
            quality: quality_for(days_elapsed),
        }
    } else {
        Derived {
            days_elapsed,
            status: status_for(days_elapsed),
            quality: CaseQuality::Pending,
        }
    };
    Some(derived)
}

/// Return the case with its derived fields brought up to date
pub fn recompute(mut case: Case, now: DateTime<Utc>) -> Case {
    case.recompute(now);
    case
}

/// Whole days from `start` to `end`, floored and clamped at zero
pub fn whole_days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let days = (end - start).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Status of an open case of the given age
pub fn status_for(days_elapsed: u32) -> CaseStatus {
    match days_elapsed {
        0..=ON_TRACK_MAX_DAYS => CaseStatus::OnTrack,
        d if d <= CRITICAL_MAX_DAYS => CaseStatus::Critical,
        _ => CaseStatus::Default,
    }
}

/// Quality of a case completed at the given age
pub fn quality_for(days_elapsed: u32) -> CaseQuality {
    match days_elapsed {
        0..=ON_TRACK_MAX_DAYS => CaseQuality::Excellent,
        d if d <= CRITICAL_MAX_DAYS => CaseQuality::Good,
        _ => CaseQuality::Default,
    }
}
