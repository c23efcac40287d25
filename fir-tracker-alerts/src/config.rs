//! Alert and schedule configuration

use chrono::NaiveTime;
use fir_tracker_notify::{CRITICAL_TEMPLATE, OVERDUE_TEMPLATE, REMINDER_TEMPLATE};
use std::time::Duration;

use crate::AlertError;

/// Template ids for each alert tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTemplates {
    pub reminder: String,
    pub critical: String,
    pub overdue: String,
}

impl Default for AlertTemplates {
    fn default() -> Self {
        Self {
            reminder: REMINDER_TEMPLATE.to_string(),
            critical: CRITICAL_TEMPLATE.to_string(),
            overdue: OVERDUE_TEMPLATE.to_string(),
        }
    }
}

/// Thresholds, routing and send limits for a sweep
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Age in days that triggers the reminder, exactly
    pub reminder_day: u32,
    /// Age in days that triggers the critical alert, exactly; older cases
    /// are overdue
    pub critical_day: u32,
    /// Digits prepended to the 10-digit subscriber number
    pub country_code: String,
    pub templates: AlertTemplates,
    /// Upper bound on concurrent gateway calls
    pub max_concurrent_sends: usize,
    /// Upper bound on a single gateway call
    pub send_timeout: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            reminder_day: 30,
            critical_day: 60,
            country_code: "91".to_string(),
            templates: AlertTemplates::default(),
            max_concurrent_sends: 4,
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.reminder_day >= self.critical_day {
            return Err(AlertError::InvalidConfig(format!(
                "reminder day ({}) must come before critical day ({})",
                self.reminder_day, self.critical_day
            )));
        }
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(AlertError::InvalidConfig(format!(
                "country code '{}' must be digits only, without '+'",
                self.country_code
            )));
        }
        if self.max_concurrent_sends == 0 {
            return Err(AlertError::InvalidConfig(
                "max concurrent sends must be at least 1".to_string(),
            ));
        }
        if self.send_timeout.is_zero() {
            return Err(AlertError::InvalidConfig("send timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// When the daily sweep fires
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Local wall-clock time of the daily sweep
    pub daily_at: NaiveTime,
    /// Also sweep once right after startup
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            run_on_startup: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        AlertConfig::default().validate().unwrap();
        assert_eq!(ScheduleConfig::default().daily_at, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn test_rejects_inverted_thresholds_and_bad_prefix() {
        let inverted = AlertConfig {
            reminder_day: 60,
            critical_day: 30,
            ..Default::default()
        };
        assert!(matches!(inverted.validate(), Err(AlertError::InvalidConfig(_))));

        let plus = AlertConfig {
            country_code: "+91".to_string(),
            ..Default::default()
        };
        assert!(plus.validate().is_err());

        let no_workers = AlertConfig {
            max_concurrent_sends: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());
    }
}
