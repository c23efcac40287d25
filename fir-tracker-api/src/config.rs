//! Service configuration
//!
//! CLI arguments with environment fallbacks. A `.env` file is loaded first
//! by the binary.

use chrono::NaiveTime;
use clap::Parser;
use fir_tracker_alerts::{AlertConfig, ScheduleConfig};
use fir_tracker_notify::{GatewayMode, GatewaySettings, WhatsAppConfig};
use std::path::PathBuf;
use std::time::Duration;

/// FIR Tracker - investigation deadline tracking and officer alerts
#[derive(Parser, Debug, Clone)]
#[command(name = "fir-tracker")]
#[command(about = "Tracks FIR investigations and alerts officers as deadlines approach")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Case store backend: memory or couchbase
    #[arg(long, env = "STORAGE_TYPE", default_value = "memory")]
    pub storage_type: String,

    #[command(flatten)]
    pub couchbase: CouchbaseArgs,

    #[command(flatten)]
    pub whatsapp: WhatsAppArgs,

    #[command(flatten)]
    pub alerts: AlertArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CouchbaseArgs {
    #[arg(long = "couchbase-url", env = "COUCHBASE_URL", default_value = "couchbase://localhost")]
    pub url: String,

    #[arg(long = "couchbase-username", env = "COUCHBASE_USERNAME", default_value = "admin")]
    pub username: String,

    #[arg(long = "couchbase-password", env = "COUCHBASE_PASSWORD", default_value = "password123")]
    pub password: String,

    #[arg(long = "couchbase-bucket", env = "COUCHBASE_BUCKET", default_value = "fir-tracker")]
    pub bucket: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WhatsAppArgs {
    /// test simulates and logs sends; production calls the WhatsApp Cloud API
    #[arg(long = "whatsapp-mode", env = "WHATSAPP_MODE", default_value = "test")]
    pub mode: GatewayMode,

    /// Cloud API bearer token
    #[arg(long = "whatsapp-token", env = "WHATSAPP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Sending phone-number id
    #[arg(long = "whatsapp-phone-id", env = "WHATSAPP_PHONE_ID")]
    pub phone_id: Option<String>,

    #[arg(
        long = "whatsapp-api-base",
        env = "WHATSAPP_API_BASE",
        default_value = "https://graph.facebook.com/v17.0"
    )]
    pub api_base: String,

    #[arg(long = "whatsapp-language", env = "WHATSAPP_LANGUAGE", default_value = "en_US")]
    pub language: String,

    /// JSON-lines file for simulated sends in test mode
    #[arg(long = "whatsapp-test-log", env = "WHATSAPP_TEST_LOG")]
    pub test_log: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AlertArgs {
    /// Local time of the daily sweep (HH:MM)
    #[arg(
        long = "alert-time",
        env = "ALERT_TIME",
        default_value = "10:00",
        value_parser = parse_time
    )]
    pub time: NaiveTime,

    #[arg(long = "alert-reminder-day", env = "ALERT_REMINDER_DAY", default_value = "30")]
    pub reminder_day: u32,

    #[arg(long = "alert-critical-day", env = "ALERT_CRITICAL_DAY", default_value = "60")]
    pub critical_day: u32,

    /// Prefix for recipient numbers, digits only
    #[arg(long = "alert-country-code", env = "ALERT_COUNTRY_CODE", default_value = "91")]
    pub country_code: String,

    #[arg(
        long = "alert-max-concurrent-sends",
        env = "ALERT_MAX_CONCURRENT_SENDS",
        default_value = "4"
    )]
    pub max_concurrent_sends: usize,

    #[arg(long = "alert-send-timeout-secs", env = "ALERT_SEND_TIMEOUT_SECS", default_value = "5")]
    pub send_timeout_secs: u64,

    /// Run one sweep as soon as the service starts
    #[arg(long = "alert-run-on-startup", env = "ALERT_RUN_ON_STARTUP", default_value = "false")]
    pub run_on_startup: bool,
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| format!("'{}' is not a time of day, expected HH:MM", value))
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            mode: self.whatsapp.mode,
            whatsapp: WhatsAppConfig {
                api_base: self.whatsapp.api_base.clone(),
                phone_number_id: self.whatsapp.phone_id.clone(),
                access_token: self.whatsapp.token.clone(),
                language_code: self.whatsapp.language.clone(),
                ..Default::default()
            },
            test_log: self.whatsapp.test_log.clone(),
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            reminder_day: self.alerts.reminder_day,
            critical_day: self.alerts.critical_day,
            country_code: self.alerts.country_code.clone(),
            max_concurrent_sends: self.alerts.max_concurrent_sends,
            send_timeout: Duration::from_secs(self.alerts.send_timeout_secs),
            ..Default::default()
        }
    }

    pub fn schedule_config(&self) -> ScheduleConfig {
        ScheduleConfig {
            daily_at: self.alerts.time,
            run_on_startup: self.alerts.run_on_startup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["fir-tracker"]).unwrap();
        assert_eq!(args.bind_addr(), "127.0.0.1:8080");
        assert_eq!(args.whatsapp.mode, GatewayMode::Test);
        assert_eq!(args.schedule_config().daily_at, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        let alerts = args.alert_config();
        assert_eq!((alerts.reminder_day, alerts.critical_day), (30, 60));
        alerts.validate().unwrap();
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "fir-tracker",
            "--whatsapp-mode",
            "production",
            "--alert-time",
            "07:30",
            "--alert-max-concurrent-sends",
            "8",
        ])
        .unwrap();
        assert_eq!(args.gateway_settings().mode, GatewayMode::Production);
        assert_eq!(args.schedule_config().daily_at, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(args.alert_config().max_concurrent_sends, 8);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(Args::try_parse_from(["fir-tracker", "--alert-time", "ten"]).is_err());
        assert!(Args::try_parse_from(["fir-tracker", "--whatsapp-mode", "staging"]).is_err());
    }
}
