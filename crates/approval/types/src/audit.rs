//! Append-only, hash-chained audit trail attached to every record.
//!
//! The trail is the system of record for who decided what. Entries are never
//! edited or removed; each entry commits to its predecessor's hash so any
//! tampering with a persisted trail is detectable on reload.

use crate::{ActorId, ApprovalError, ApprovalResult, GateName, RecordId, RequestToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A gate decision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approve => write!(f, "approve"),
            Decision::Reject => write!(f, "reject"),
        }
    }
}

/// What an audit entry records
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAction {
    Approve,
    Reject,
    Cancel,
    /// Numeric adjustment, not tied to a gate
    Adjust { delta: i64 },
}

impl AuditAction {
    pub fn is_gate_decision(&self) -> bool {
        matches!(self, AuditAction::Approve | AuditAction::Reject)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Approve => "approve",
            AuditAction::Reject => "reject",
            AuditAction::Cancel => "cancel",
            AuditAction::Adjust { .. } => "adjust",
        }
    }
}

impl From<Decision> for AuditAction {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => AuditAction::Approve,
            Decision::Reject => AuditAction::Reject,
        }
    }
}

/// The caller-supplied part of an entry, before sequencing and hashing
#[derive(Clone, Debug)]
pub struct AuditDraft {
    pub gate: Option<GateName>,
    pub actor_id: ActorId,
    pub action: AuditAction,
    pub comment: Option<String>,
    pub request_token: Option<RequestToken>,
}

impl AuditDraft {
    pub fn decision(
        gate: GateName,
        actor_id: ActorId,
        decision: Decision,
        comment: Option<String>,
        request_token: Option<RequestToken>,
    ) -> Self {
        Self {
            gate: Some(gate),
            actor_id,
            action: decision.into(),
            comment,
            request_token,
        }
    }

    pub fn cancel(actor_id: ActorId, request_token: Option<RequestToken>) -> Self {
        Self {
            gate: None,
            actor_id,
            action: AuditAction::Cancel,
            comment: None,
            request_token,
        }
    }

    pub fn adjust(
        actor_id: ActorId,
        delta: i64,
        reason: impl Into<String>,
        request_token: Option<RequestToken>,
    ) -> Self {
        Self {
            gate: None,
            actor_id,
            action: AuditAction::Adjust { delta },
            comment: Some(reason.into()),
            request_token,
        }
    }
}

/// Immutable audit entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateName>,
    pub actor_id: ActorId,
    pub action: AuditAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_token: Option<RequestToken>,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

/// Ordered audit entries for a single record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild a trail from persisted entries and verify its hash chain.
    pub fn from_entries(record_id: &RecordId, entries: Vec<AuditEntry>) -> ApprovalResult<Self> {
        let trail = Self { entries };

        for (expected, entry) in trail.entries.iter().enumerate() {
            if entry.sequence != expected as u64 {
                return Err(ApprovalError::AuditIntegrity(format!(
                    "sequence gap in trail of {} at position {} (found {})",
                    record_id, expected, entry.sequence
                )));
            }
        }

        if !trail.verify_chain(record_id) {
            return Err(ApprovalError::AuditIntegrity(format!(
                "hash-chain verification failed for {}",
                record_id
            )));
        }

        Ok(trail)
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    pub fn find_by_token(&self, token: &RequestToken) -> Option<&AuditEntry> {
        self.entries
            .iter()
            .find(|entry| entry.request_token.as_ref() == Some(token))
    }

    /// Entries that record an approve or reject at a gate
    pub fn gate_decisions(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.action.is_gate_decision())
    }

    /// Sequence, timestamp and hash the draft and append it.
    pub fn append(&mut self, record_id: &RecordId, draft: AuditDraft) -> &AuditEntry {
        let sequence = self.entries.len() as u64;
        let timestamp = Utc::now();
        let previous_hash = self.entries.last().map(|entry| entry.entry_hash.clone());

        let mut entry = AuditEntry {
            sequence,
            gate: draft.gate,
            actor_id: draft.actor_id,
            action: draft.action,
            comment: draft.comment,
            request_token: draft.request_token,
            timestamp,
            previous_hash,
            entry_hash: String::new(),
        };
        entry.entry_hash = compute_entry_hash(record_id, &entry);

        tracing::trace!(
            record_id = %record_id,
            sequence,
            action = entry.action.as_str(),
            "Audit entry appended"
        );

        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn verify_chain(&self, record_id: &RecordId) -> bool {
        let mut previous_hash: Option<String> = None;
        for entry in &self.entries {
            if entry.previous_hash != previous_hash {
                return false;
            }
            if entry.entry_hash != compute_entry_hash(record_id, entry) {
                return false;
            }
            previous_hash = Some(entry.entry_hash.clone());
        }
        true
    }
}

fn compute_entry_hash(record_id: &RecordId, entry: &AuditEntry) -> String {
    let material = serde_json::json!({
        "record_id": record_id,
        "sequence": entry.sequence,
        "gate": entry.gate,
        "actor_id": entry.actor_id,
        "action": entry.action,
        "comment": entry.comment,
        "request_token": entry.request_token,
        "timestamp": entry.timestamp,
        "previous_hash": entry.previous_hash,
    });

    let bytes = serde_json::to_vec(&material).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}
