//! Sweep planning: recompute open cases and decide who gets which alert
//!
//! Planning is pure. The dispatcher persists and sends what the plan says.

use chrono::{DateTime, Utc};
use fir_tracker_core::{AlertEvent, AlertTier, Case};
use uuid::Uuid;

use crate::{normalize_phone, AlertConfig, InputError};

/// A case that qualified for an alert but cannot be sent one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub case_id: Uuid,
    pub fir_number: String,
    pub tier: Option<AlertTier>,
    pub error: InputError,
}

/// What a sweep should do
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    /// Open cases whose derived fields changed and need writing back
    pub updates: Vec<Case>,
    /// Open cases examined
    pub examined: usize,
    pub events: Vec<AlertEvent>,
    pub rejected: Vec<Rejection>,
}

/// Alert tier for an open case of the given age. The two fixed thresholds
/// match exactly; the overdue tier matches every day past the critical day.
pub fn classify(days_elapsed: u32, config: &AlertConfig) -> Option<AlertTier> {
    if days_elapsed == config.reminder_day {
        Some(AlertTier::Reminder)
    } else if days_elapsed == config.critical_day {
        Some(AlertTier::Critical)
    } else if days_elapsed > config.critical_day {
        Some(AlertTier::Overdue)
    } else {
        None
    }
}

fn template_and_parameters(
    case: &Case,
    tier: AlertTier,
    config: &AlertConfig,
) -> (String, Vec<String>) {
    match tier {
        AlertTier::Reminder => (config.templates.reminder.clone(), vec![case.fir_number.clone()]),
        AlertTier::Critical => (config.templates.critical.clone(), vec![case.fir_number.clone()]),
        AlertTier::Overdue => (
            config.templates.overdue.clone(),
            vec![case.fir_number.clone(), case.days_elapsed.to_string()],
        ),
    }
}

/// Recompute every open case as of `now` and build at most one alert per case
pub fn plan_sweep(open_cases: Vec<Case>, now: DateTime<Utc>, config: &AlertConfig) -> SweepPlan {
    let mut plan = SweepPlan::default();

    for mut case in open_cases.into_iter().filter(Case::is_open) {
        plan.examined += 1;

        if case.fir_date.is_none() {
            plan.rejected.push(Rejection {
                case_id: case.id,
                fir_number: case.fir_number.clone(),
                tier: None,
                error: InputError::MissingFirDate,
            });
            continue;
        }

        let before = case.derived();
        case.recompute(now);

        if let Some(tier) = classify(case.days_elapsed, config) {
            match normalize_phone(&case.io_phone, &config.country_code) {
                Ok(recipient) => {
                    let (template_id, parameters) = template_and_parameters(&case, tier, config);
                    plan.events.push(AlertEvent {
                        case_id: case.id,
                        fir_number: case.fir_number.clone(),
                        threshold_crossed: tier,
                        recipient,
                        template_id,
                        parameters,
                    });
                }
                Err(error) => plan.rejected.push(Rejection {
                    case_id: case.id,
                    fir_number: case.fir_number.clone(),
                    tier: Some(tier),
                    error,
                }),
            }
        }

        if case.derived() != before {
            plan.updates.push(case);
        }
    }

    plan
}
