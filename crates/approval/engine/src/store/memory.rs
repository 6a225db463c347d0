//! In-memory reference implementation of [`RecordStore`].
//!
//! Deterministic and test-friendly. Production deployments should use a
//! transactional backend for source-of-truth data.

use super::{RecordFilter, RecordStore, StorageError, StorageResult};
use approval_types::{RecordId, RecordType, WorkflowRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory record store
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, WorkflowRecord>>,
    sequences: DashMap<RecordType, u64>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn reserve_id(&self, record_type: RecordType) -> StorageResult<RecordId> {
        let sequence = {
            let mut slot = self.sequences.entry(record_type).or_insert(0);
            *slot += 1;
            *slot
        };
        Ok(RecordId::from_sequence(record_type.id_prefix(), sequence))
    }

    async fn insert(&self, record: WorkflowRecord) -> StorageResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;

        if guard.contains_key(&record.id) {
            return Err(StorageError::Conflict(format!(
                "record {} already exists",
                record.id
            )));
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> StorageResult<Option<WorkflowRecord>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn update(&self, record: WorkflowRecord, expected_version: u64) -> StorageResult<()> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        let stored = guard
            .get_mut(&record.id)
            .ok_or_else(|| StorageError::NotFound(format!("record {} not found", record.id)))?;

        if stored.version != expected_version {
            return Err(StorageError::Conflict(format!(
                "record {} is at version {}, expected {}",
                record.id, stored.version, expected_version
            )));
        }

        if !record
            .audit_trail
            .entries()
            .starts_with(stored.audit_trail.entries())
        {
            return Err(StorageError::InvariantViolation(format!(
                "audit trail of {} must only grow",
                record.id
            )));
        }

        *stored = record;
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> StorageResult<Vec<WorkflowRecord>> {
        let guard = self
            .records
            .read()
            .map_err(|_| StorageError::Backend("records lock poisoned".to_string()))?;
        let mut values: Vec<_> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(values)
    }
}
