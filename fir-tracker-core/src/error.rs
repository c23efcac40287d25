//! Error types for the core crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error("FIR number is immutable (stored '{stored}', requested '{requested}')")]
    FirNumberImmutable { stored: String, requested: String },

    #[error("Case already completed: {0}")]
    AlreadyCompleted(String),
}
