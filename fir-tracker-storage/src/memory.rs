//! In-memory storage implementation for development and testing

use async_trait::async_trait;
use fir_tracker_core::{Case, CaseFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{CaseStorage, StorageError};

/// In-memory storage for development and testing
pub struct InMemoryStorage {
    cases: RwLock<HashMap<Uuid, Case>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            cases: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the store with cases as-is
    pub fn with_cases(cases: impl IntoIterator<Item = Case>) -> Self {
        let storage = Self::new();
        {
            let mut map = storage.cases.write();
            for case in cases {
                map.insert(case.id, case);
            }
        }
        storage
    }

    pub fn len(&self) -> usize {
        self.cases.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.read().is_empty()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseStorage for InMemoryStorage {
    async fn create(&self, case: Case) -> Result<Case, StorageError> {
        let mut cases = self.cases.write();
        if cases.contains_key(&case.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Case with id {} already exists",
                case.id
            )));
        }
        if cases.values().any(|c| c.fir_number == case.fir_number) {
            return Err(StorageError::AlreadyExists(format!(
                "FIR number {} already registered",
                case.fir_number
            )));
        }
        cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Case>, StorageError> {
        let cases = self.cases.read();
        Ok(cases.get(&id).cloned())
    }

    async fn get_by_fir_number(&self, fir_number: &str) -> Result<Option<Case>, StorageError> {
        let cases = self.cases.read();
        Ok(cases.values().find(|c| c.fir_number == fir_number).cloned())
    }

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, StorageError> {
        let cases = self.cases.read();
        let mut matching: Vec<_> = cases.values().filter(|c| filter.matches(c)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn upsert(&self, case: Case) -> Result<Case, StorageError> {
        let mut cases = self.cases.write();
        cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn update(&self, case: Case) -> Result<Case, StorageError> {
        let mut cases = self.cases.write();
        match cases.get_mut(&case.id) {
            Some(existing) => {
                *existing = case.clone();
                Ok(case)
            }
            None => Err(StorageError::NotFound(format!("Case with id {} not found", case.id))),
        }
    }

    async fn store_derived(&self, snapshot: &Case) -> Result<bool, StorageError> {
        let mut cases = self.cases.write();
        let existing = cases.get_mut(&snapshot.id).ok_or_else(|| {
            StorageError::NotFound(format!("Case with id {} not found", snapshot.id))
        })?;
        if existing.is_completed || existing.fir_date != snapshot.fir_date {
            return Ok(false);
        }
        existing.set_derived(snapshot.derived());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use fir_tracker_core::{recompute, CaseQuality, CaseStatus};

    fn case(fir_number: &str, created_offset_days: i64) -> Case {
        let fir_date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Case::new(
            fir_number.to_string(),
            fir_date,
            "9876543210".to_string(),
            fir_date + Duration::days(created_offset_days),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_case() {
        let storage = InMemoryStorage::new();
        let saved = storage.create(case("FIR-1", 0)).await.unwrap();

        let by_id = storage.get_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(by_id.fir_number, "FIR-1");

        let by_fir = storage.get_by_fir_number("FIR-1").await.unwrap().unwrap();
        assert_eq!(by_fir.id, saved.id);
        assert!(storage.get_by_fir_number("FIR-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_fir_number_rejected() {
        let storage = InMemoryStorage::new();
        storage.create(case("FIR-1", 0)).await.unwrap();

        let err = storage.create(case("FIR-1", 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_list_open_newest_first() {
        let storage = InMemoryStorage::new();
        storage.create(case("FIR-old", 0)).await.unwrap();
        storage.create(case("FIR-new", 5)).await.unwrap();
        let mut done = case("FIR-done", 3);
        done.is_completed = true;
        storage.create(done).await.unwrap();

        let open = storage.list_open().await.unwrap();
        let numbers: Vec<_> = open.iter().map(|c| c.fir_number.as_str()).collect();
        assert_eq!(numbers, vec!["FIR-new", "FIR-old"]);

        let all = storage.list(&CaseFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_update_missing_case_fails() {
        let storage = InMemoryStorage::new();
        let err = storage.update(case("FIR-1", 0)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_derived_keeps_source_fields() {
        let storage = InMemoryStorage::new();
        let saved = storage.create(case("FIR-1", 0)).await.unwrap();

        // An operator edit lands between the sweep's read and its write.
        let mut edited = saved.clone();
        edited.io_phone = "9123456789".to_string();
        storage.update(edited).await.unwrap();

        let fir_date = saved.fir_date.unwrap();
        let recomputed = recompute(saved.clone(), fir_date + Duration::days(45));
        assert!(storage.store_derived(&recomputed).await.unwrap());

        let stored = storage.get_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(stored.io_phone, "9123456789");
        assert_eq!(stored.days_elapsed, 45);
        assert_eq!(stored.status, CaseStatus::Critical);
        assert_eq!(stored.quality, CaseQuality::Pending);
    }

    #[tokio::test]
    async fn test_store_derived_leaves_completed_case_alone() {
        let storage = InMemoryStorage::new();
        let saved = storage.create(case("FIR-1", 0)).await.unwrap();
        let fir_date = saved.fir_date.unwrap();
        let snapshot = recompute(saved.clone(), fir_date + Duration::days(45));

        let closed_at = fir_date + Duration::days(40);
        let mut completed = saved.clone();
        completed.complete("CC-1".to_string(), None, closed_at).unwrap();
        completed.recompute(closed_at);
        storage.update(completed).await.unwrap();

        assert!(!storage.store_derived(&snapshot).await.unwrap());
        let stored = storage.get_by_id(saved.id).await.unwrap().unwrap();
        assert!(stored.is_completed);
        assert_eq!(stored.status, CaseStatus::Completed);
        assert_eq!(stored.days_elapsed, 40);
    }

    #[tokio::test]
    async fn test_store_derived_leaves_redated_case_alone() {
        let storage = InMemoryStorage::new();
        let saved = storage.create(case("FIR-1", 0)).await.unwrap();
        let fir_date = saved.fir_date.unwrap();
        let snapshot = recompute(saved.clone(), fir_date + Duration::days(45));

        let mut redated = saved.clone();
        redated.fir_date = Some(fir_date + Duration::days(30));
        storage.update(redated).await.unwrap();

        assert!(!storage.store_derived(&snapshot).await.unwrap());
        let stored = storage.get_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(stored.days_elapsed, saved.days_elapsed);
    }

    #[tokio::test]
    async fn test_store_derived_missing_case_fails() {
        let storage = InMemoryStorage::new();
        let err = storage.store_derived(&case("FIR-1", 0)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
