//! Storage traits defining the interface for persistence

use async_trait::async_trait;
use fir_tracker_core::{Case, CaseFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::StorageError;

/// A stored document that matched the open-case query but could not be
/// decoded as a case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableCase {
    pub document_id: String,
    pub error: String,
}

/// Result of reading every open case for a sweep
#[derive(Debug, Clone, Default)]
pub struct OpenScan {
    pub cases: Vec<Case>,
    pub unreadable: Vec<UnreadableCase>,
}

/// Document collection of cases keyed by case id.
///
/// Backends persist what they are given; recomputing derived fields before a
/// write is the caller's job. Each call is atomic with respect to the case it
/// touches.
#[async_trait]
pub trait CaseStorage: Send + Sync {
    /// Insert a new case. Fails if the id or FIR number is already taken.
    async fn create(&self, case: Case) -> Result<Case, StorageError>;

    /// Get a case by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Case>, StorageError>;

    /// Get a case by its FIR number
    async fn get_by_fir_number(&self, fir_number: &str) -> Result<Option<Case>, StorageError>;

    /// List cases matching the filter, newest first
    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, StorageError>;

    /// All cases whose investigation is still open
    async fn list_open(&self) -> Result<Vec<Case>, StorageError> {
        self.list(&CaseFilter::open()).await
    }

    /// Open cases plus any open-case documents that failed to decode.
    /// Backends that cannot hold undecodable documents report none.
    async fn scan_open(&self) -> Result<OpenScan, StorageError> {
        Ok(OpenScan {
            cases: self.list_open().await?,
            unreadable: Vec::new(),
        })
    }

    /// Insert or replace a case
    async fn upsert(&self, case: Case) -> Result<Case, StorageError>;

    /// Replace an existing case
    async fn update(&self, case: Case) -> Result<Case, StorageError>;

    /// Copy the derived fields of `snapshot` onto the stored case, leaving
    /// its source fields alone.
    ///
    /// The write only lands while the stored case is still open and has the
    /// same FIR date as the snapshot. Returns `Ok(false)` when the case was
    /// completed or re-dated after the snapshot was read.
    async fn store_derived(&self, snapshot: &Case) -> Result<bool, StorageError>;
}
