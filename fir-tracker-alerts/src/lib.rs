//! Daily investigation alerts
//!
//! A sweep recomputes every open case, persists the fresh ages, picks the
//! cases sitting on an alert threshold and sends one templated message per
//! case to its investigating officer. The scheduler fires one sweep per day.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod phone;
pub mod scheduler;
pub mod sweep;

pub use config::{AlertConfig, AlertTemplates, ScheduleConfig};
pub use dispatcher::{AlertDispatcher, DispatchRecord, DispatchStatus, SweepSummary};
pub use error::{AlertError, InputError};
pub use phone::normalize_phone;
pub use scheduler::{next_fire_after, AlertScheduler};
pub use sweep::{classify, plan_sweep, Rejection, SweepPlan};
