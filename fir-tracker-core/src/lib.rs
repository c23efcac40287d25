//! Core domain models for FIR Tracker
//!
//! This crate contains the case record, the investigation lifecycle
//! engine that derives a case's age, status and quality, and the
//! statistics shared by the dashboard and the alert sweep.

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::CoreError;
pub use lifecycle::{derive, recompute, Derived};
pub use models::*;
pub use stats::{CaseStats, GroupStats, PerformanceSummary, QualityBreakdown};
