//! Alert error types

use fir_tracker_storage::StorageError;
use thiserror::Error;

/// Sweep-level failures. Anything scoped to one case or one send is
/// recorded in the sweep summary instead.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("A sweep is already running")]
    SweepInProgress,

    #[error("Failed to load open cases: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid alert configuration: {0}")]
    InvalidConfig(String),
}

/// Problems with one case's data that keep it from being alerted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("case has no FIR date")]
    MissingFirDate,

    #[error("phone number '{phone}' has {digits} digits, need at least 10")]
    InvalidPhone { phone: String, digits: usize },
}
