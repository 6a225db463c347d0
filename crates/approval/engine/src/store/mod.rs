//! Record store: where workflow records and their audit trails live.
//!
//! The engine only talks to the [`RecordStore`] trait. [`InMemoryRecordStore`]
//! is the reference implementation; durable backends implement the same
//! contract (atomic id reservation, optimistic version check on update,
//! append-only audit trails).

pub mod memory;

pub use memory::InMemoryRecordStore;

use approval_types::{
    ActorId, ApprovalError, RecordId, RecordState, RecordType, WorkflowRecord,
};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for ApprovalError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Serialization(msg) => ApprovalError::Serialization(msg),
            other => ApprovalError::Storage(other.to_string()),
        }
    }
}

/// Selection criteria for listing records
#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    pub record_type: Option<RecordType>,
    pub state: Option<RecordState>,
    pub submitted_by: Option<ActorId>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_type(record_type: RecordType) -> Self {
        Self {
            record_type: Some(record_type),
            ..Self::default()
        }
    }

    pub fn in_state(mut self, state: RecordState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn submitted_by(mut self, actor: ActorId) -> Self {
        self.submitted_by = Some(actor);
        self
    }

    pub fn matches(&self, record: &WorkflowRecord) -> bool {
        self.record_type.map_or(true, |t| record.record_type == t)
            && self.state.map_or(true, |s| record.state == s)
            && self
                .submitted_by
                .as_ref()
                .map_or(true, |actor| &record.submitted_by == actor)
    }
}

/// Persistence contract for workflow records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Atomically reserve the next identifier for a record type
    async fn reserve_id(&self, record_type: RecordType) -> StorageResult<RecordId>;

    /// Insert a new record; fails with `Conflict` if the id exists
    async fn insert(&self, record: WorkflowRecord) -> StorageResult<()>;

    async fn get(&self, id: &RecordId) -> StorageResult<Option<WorkflowRecord>>;

    /// Replace a record if its stored version equals `expected_version`.
    /// The new audit trail must extend the stored one.
    async fn update(&self, record: WorkflowRecord, expected_version: u64) -> StorageResult<()>;

    /// Matching records, oldest first
    async fn list(&self, filter: &RecordFilter) -> StorageResult<Vec<WorkflowRecord>>;
}
