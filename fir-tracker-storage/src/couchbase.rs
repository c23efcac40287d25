//! Couchbase storage implementation
//!
//! Provides persistent storage for case documents using Couchbase.

use async_trait::async_trait;
use couchbase::{
    cluster::Cluster,
    collection::Collection,
    options::{
        cluster_options::ClusterOptions,
        diagnostic_options::WaitUntilReadyOptions,
        kv_options::{GetOptions, InsertOptions, RemoveOptions, UpsertOptions},
        query_options::QueryOptions,
    },
};
use tokio_stream::StreamExt;

use couchbase::authenticator::{Authenticator, PasswordAuthenticator};

use fir_tracker_core::{Case, CaseFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::{CaseStorage, OpenScan, StorageError, UnreadableCase};

/// Document type markers for N1QL queries
const DOC_TYPE_CASE: &str = "case";
const DOC_TYPE_FIR_NUMBER: &str = "fir_number";

/// Couchbase storage configuration
#[derive(Debug, Clone)]
pub struct CouchbaseConfig {
    pub connection_string: String,
    pub username: String,
    pub password: String,
    pub bucket_name: String,
}

impl Default for CouchbaseConfig {
    fn default() -> Self {
        Self {
            connection_string: "couchbase://localhost".to_string(),
            username: "admin".to_string(),
            password: "password123".to_string(),
            bucket_name: "fir-tracker".to_string(),
        }
    }
}

/// Couchbase storage for cases
pub struct CouchbaseStorage {
    cluster: Arc<Cluster>,
    collection: Collection,
    bucket_name: String,
}

impl CouchbaseStorage {
    /// Create a new Couchbase storage instance
    pub async fn new(config: CouchbaseConfig) -> Result<Self, StorageError> {
        let authenticator = PasswordAuthenticator::new(&config.username, &config.password);
        let options = ClusterOptions::new(Authenticator::PasswordAuthenticator(authenticator));
        let cluster = Cluster::connect(&config.connection_string, options)
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect to cluster: {}", e)))?;

        let bucket = cluster.bucket(&config.bucket_name);
        let _: () = bucket
            .wait_until_ready(WaitUntilReadyOptions::default())
            .await
            .map_err(|e: couchbase::error::Error| {
                StorageError::Connection(format!("Failed to connect to bucket: {}", e))
            })?;

        let collection = bucket.default_collection();

        tracing::info!(
            connection = %config.connection_string,
            bucket = %config.bucket_name,
            "Connected to Couchbase"
        );

        Ok(Self {
            cluster: Arc::new(cluster),
            collection,
            bucket_name: config.bucket_name,
        })
    }

    /// Execute a N1QL query. A row that does not decode fails the whole query.
    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        statement: &str,
    ) -> Result<Vec<T>, StorageError> {
        let mut result = self
            .cluster
            .query(statement, QueryOptions::default())
            .await
            .map_err(|e: couchbase::error::Error| {
                StorageError::Internal(format!("Query failed: {}", e))
            })?;

        let mut rows = Vec::new();
        let mut row_iter = result.rows::<T>();

        while let Some(row) = row_iter.next().await {
            match row {
                Ok(r) => rows.push(r),
                Err(e) => {
                    return Err(StorageError::Internal(format!("Failed to read row: {}", e)));
                }
            }
        }

        Ok(rows)
    }

    fn doc_id(id: Uuid) -> String {
        format!("case::{}", id)
    }

    fn fir_doc_id(fir_number: &str) -> String {
        format!("fir::{}", fir_number)
    }

    /// Claim a FIR number for a case. The KV insert fails if the key exists,
    /// which makes the claim atomic across concurrent creates.
    async fn reserve_fir_number(&self, case: &Case) -> Result<(), StorageError> {
        let doc = FirNumberDocument::new(case);
        match self
            .collection
            .insert(&Self::fir_doc_id(&case.fir_number), &doc, InsertOptions::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_document_exists(&e) => Err(StorageError::AlreadyExists(format!(
                "FIR number {} already registered",
                case.fir_number
            ))),
            Err(e) => Err(StorageError::Internal(format!(
                "Failed to reserve FIR number: {}",
                e
            ))),
        }
    }

    async fn release_fir_number(&self, fir_number: &str) {
        let doc_id = Self::fir_doc_id(fir_number);
        if let Err(e) = self.collection.remove(&doc_id, RemoveOptions::default()).await {
            tracing::warn!(fir_number = %fir_number, error = %e, "Failed to release FIR number");
        }
    }

    fn where_clause(filter: &CaseFilter) -> Result<String, StorageError> {
        let mut clauses = vec![format!("c.type = {}", literal(DOC_TYPE_CASE)?)];
        if let Some(status) = filter.status {
            clauses.push(format!("c.status = {}", literal(status.as_str())?));
        }
        if let Some(station) = &filter.police_station {
            clauses.push(format!("c.police_station = {}", literal(station)?));
        }
        if let Some(sub_division) = &filter.sub_division {
            clauses.push(format!("c.sub_division = {}", literal(sub_division)?));
        }
        if let Some(io_name) = &filter.io_name {
            clauses.push(format!(
                "CONTAINS(LOWER(c.io_name), {})",
                literal(&io_name.to_lowercase())?
            ));
        }
        if let Some(is_completed) = filter.is_completed {
            clauses.push(format!("c.is_completed = {}", is_completed));
        }
        Ok(clauses.join(" AND "))
    }
}

/// Render a value as a JSON literal, which N1QL accepts as-is
fn literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

fn is_document_exists(e: &couchbase::error::Error) -> bool {
    e.to_string().contains("DocumentExists")
}

fn is_document_not_found(e: &couchbase::error::Error) -> bool {
    e.to_string().contains("DocumentNotFound")
}

/// Split raw open-case rows into decoded cases and documents that no longer
/// parse as a case
fn decode_open_rows(rows: Vec<RawCaseRow>) -> OpenScan {
    let mut scan = OpenScan::default();
    for row in rows {
        match serde_json::from_value::<TypedDocument<Case>>(row.doc) {
            Ok(doc) => scan.cases.push(doc.data),
            Err(e) => scan.unreadable.push(UnreadableCase {
                document_id: row.document_id,
                error: e.to_string(),
            }),
        }
    }
    scan
}

/// One row of the open-case scan, before decoding
#[derive(Debug, serde::Deserialize)]
struct RawCaseRow {
    document_id: String,
    doc: serde_json::Value,
}

/// Key document that owns a FIR number
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct FirNumberDocument {
    #[serde(rename = "type")]
    doc_type: String,
    case_id: Uuid,
}

impl FirNumberDocument {
    fn new(case: &Case) -> Self {
        Self {
            doc_type: DOC_TYPE_FIR_NUMBER.to_string(),
            case_id: case.id,
        }
    }
}

/// Wrapper for documents with type field
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct TypedDocument<T> {
    #[serde(rename = "type")]
    doc_type: String,
    #[serde(flatten)]
    data: T,
}

impl TypedDocument<Case> {
    fn case(case: Case) -> Self {
        Self {
            doc_type: DOC_TYPE_CASE.to_string(),
            data: case,
        }
    }
}

#[async_trait]
impl CaseStorage for CouchbaseStorage {
    async fn create(&self, case: Case) -> Result<Case, StorageError> {
        self.reserve_fir_number(&case).await?;

        let doc_id = Self::doc_id(case.id);
        let doc = TypedDocument::case(case.clone());
        if let Err(e) = self.collection.insert(&doc_id, &doc, InsertOptions::default()).await {
            self.release_fir_number(&case.fir_number).await;
            if is_document_exists(&e) {
                return Err(StorageError::AlreadyExists(format!(
                    "Case with id {} already exists",
                    case.id
                )));
            }
            return Err(StorageError::Internal(format!("Failed to create case: {}", e)));
        }

        tracing::debug!(case_id = %case.id, fir_number = %case.fir_number, "Created case");
        Ok(case)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Case>, StorageError> {
        match self.collection.get(&Self::doc_id(id), GetOptions::default()).await {
            Ok(result) => {
                let doc = result.content_as::<TypedDocument<Case>>().map_err(|e| {
                    StorageError::Serialization(serde_json::Error::io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    )))
                })?;
                Ok(Some(doc.data))
            }
            Err(e) if is_document_not_found(&e) => Ok(None),
            Err(e) => Err(StorageError::Internal(format!("Failed to get case: {}", e))),
        }
    }

    async fn get_by_fir_number(&self, fir_number: &str) -> Result<Option<Case>, StorageError> {
        let key = Self::fir_doc_id(fir_number);
        let owner = match self.collection.get(&key, GetOptions::default()).await {
            Ok(result) => result.content_as::<FirNumberDocument>().map_err(|e| {
                StorageError::Internal(format!("Unreadable FIR number document: {}", e))
            })?,
            Err(e) if is_document_not_found(&e) => return Ok(None),
            Err(e) => {
                return Err(StorageError::Internal(format!("Failed to get FIR number: {}", e)))
            }
        };
        self.get_by_id(owner.case_id).await
    }

    async fn list(&self, filter: &CaseFilter) -> Result<Vec<Case>, StorageError> {
        let query = format!(
            r#"
            SELECT c.*
            FROM `{}` c
            WHERE {}
            ORDER BY c.created_at DESC
            "#,
            self.bucket_name,
            Self::where_clause(filter)?
        );

        self.query(&query).await
    }

    async fn scan_open(&self) -> Result<OpenScan, StorageError> {
        let query = format!(
            r#"
            SELECT META(c).id AS document_id, c AS doc
            FROM `{}` c
            WHERE {}
            ORDER BY c.created_at DESC
            "#,
            self.bucket_name,
            Self::where_clause(&CaseFilter::open())?
        );

        let rows: Vec<RawCaseRow> = self.query(&query).await?;
        let scan = decode_open_rows(rows);
        for unreadable in &scan.unreadable {
            tracing::warn!(
                document_id = %unreadable.document_id,
                error = %unreadable.error,
                "Open case document could not be decoded"
            );
        }
        Ok(scan)
    }

    async fn upsert(&self, case: Case) -> Result<Case, StorageError> {
        let fir_doc = FirNumberDocument::new(&case);
        self.collection
            .upsert(&Self::fir_doc_id(&case.fir_number), &fir_doc, UpsertOptions::default())
            .await
            .map_err(|e| StorageError::Internal(format!("Failed to save FIR number: {}", e)))?;

        let doc_id = Self::doc_id(case.id);
        let doc = TypedDocument::case(case.clone());
        self.collection
            .upsert(&doc_id, &doc, UpsertOptions::default())
            .await
            .map_err(|e| StorageError::Internal(format!("Failed to save case: {}", e)))?;

        tracing::debug!(case_id = %case.id, "Saved case");
        Ok(case)
    }

    async fn update(&self, case: Case) -> Result<Case, StorageError> {
        if self.get_by_id(case.id).await?.is_none() {
            return Err(StorageError::NotFound(format!("Case with id {} not found", case.id)));
        }
        self.upsert(case).await
    }

    async fn store_derived(&self, snapshot: &Case) -> Result<bool, StorageError> {
        let statement = Self::store_derived_statement(&self.bucket_name, snapshot)?;
        let updated: Vec<serde_json::Value> = self.query(&statement).await?;
        if !updated.is_empty() {
            return Ok(true);
        }
        if self.get_by_id(snapshot.id).await?.is_none() {
            return Err(StorageError::NotFound(format!("Case with id {} not found", snapshot.id)));
        }
        Ok(false)
    }
}

impl CouchbaseStorage {
    /// Conditional write of the derived fields: it only matches while the
    /// stored case is open and still carries the snapshot's FIR date
    fn store_derived_statement(bucket_name: &str, snapshot: &Case) -> Result<String, StorageError> {
        let derived = snapshot.derived();
        Ok(format!(
            r#"
            UPDATE `{}` c
            USE KEYS {}
            SET c.days_elapsed = {}, c.status = {}, c.quality = {}
            WHERE c.is_completed = false AND c.fir_date = {}
            RETURNING META(c).id
            "#,
            bucket_name,
            literal(&Self::doc_id(snapshot.id))?,
            derived.days_elapsed,
            literal(derived.status.as_str())?,
            literal(derived.quality.as_str())?,
            literal(&snapshot.fir_date)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fir_tracker_core::CaseStatus;

    fn case() -> Case {
        let fir_date = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Case::new("FIR-1".to_string(), fir_date, "9876543210".to_string(), fir_date)
    }

    #[test]
    fn test_where_clause_quotes_user_input() {
        let filter = CaseFilter {
            status: Some(CaseStatus::OnTrack),
            io_name: Some("O'Brien".to_string()),
            is_completed: Some(false),
            ..Default::default()
        };
        let clause = CouchbaseStorage::where_clause(&filter).unwrap();
        assert_eq!(
            clause,
            concat!(
                r#"c.type = "case" AND c.status = "On Track" AND "#,
                r#"CONTAINS(LOWER(c.io_name), "o'brien") AND c.is_completed = false"#
            )
        );
    }

    #[test]
    fn test_store_derived_statement_is_conditional() {
        let case = case();
        let statement = CouchbaseStorage::store_derived_statement("fir-tracker", &case).unwrap();
        assert!(statement.contains(&format!(r#"USE KEYS "case::{}""#, case.id)));
        assert!(statement
            .contains(r#"WHERE c.is_completed = false AND c.fir_date = "2025-01-01T00:00:00Z""#));
    }

    #[test]
    fn test_undecodable_open_rows_are_reported() {
        let good = case();
        let rows = vec![
            RawCaseRow {
                document_id: format!("case::{}", good.id),
                doc: serde_json::to_value(TypedDocument::case(good.clone())).unwrap(),
            },
            RawCaseRow {
                document_id: "case::broken".to_string(),
                doc: serde_json::json!({"type": "case", "fir_number": 42}),
            },
        ];

        let scan = decode_open_rows(rows);
        assert_eq!(scan.cases.len(), 1);
        assert_eq!(scan.cases[0].id, good.id);
        assert_eq!(scan.unreadable.len(), 1);
        assert_eq!(scan.unreadable[0].document_id, "case::broken");
        assert!(!scan.unreadable[0].error.is_empty());
    }
}
