//! Workflow records: entities under approval and their runtime state.

use crate::{
    AccountId, ActorId, ApprovalError, ApprovalResult, AuditEntry, AuditTrail, GateName, RecordAttributes,
    RecordId, RecordType, SideEffect,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Record State ─────────────────────────────────────────────────────

/// Lifecycle state of a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Awaiting a decision at the current gate
    Pending,
    Approved,
    Completed,
    Posted,
    Paid,
    Rejected,
    Cancelled,
}

impl RecordState {
    pub const ALL: [RecordState; 7] = [
        RecordState::Pending,
        RecordState::Approved,
        RecordState::Completed,
        RecordState::Posted,
        RecordState::Paid,
        RecordState::Rejected,
        RecordState::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordState::Pending)
    }

    pub fn is_success_terminal(&self) -> bool {
        matches!(
            self,
            RecordState::Approved | RecordState::Completed | RecordState::Posted | RecordState::Paid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Pending => "pending",
            RecordState::Approved => "approved",
            RecordState::Completed => "completed",
            RecordState::Posted => "posted",
            RecordState::Paid => "paid",
            RecordState::Rejected => "rejected",
            RecordState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Side-Effect Receipts ─────────────────────────────────────────────

/// One balance change made by a settled record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePosting {
    pub account: AccountId,
    pub delta: i64,
    pub balance_after: i64,
}

/// Proof that the success-transition side effect was applied
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectReceipt {
    pub effect: SideEffect,
    /// Journal-entry id for postings, movement id for balance changes
    pub reference: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postings: Vec<BalancePosting>,
    pub applied_at: DateTime<Utc>,
}

// ── Non-State Metadata ───────────────────────────────────────────────

/// A document attached to a record (due-diligence reports, payslips, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub attached_by: ActorId,
    pub attached_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: impl Into<String>, attached_by: ActorId) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            uri: None,
            attached_by,
            attached_at: Utc::now(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareChannel {
    Whatsapp,
    Email,
    Telegram,
}

/// Record of an investment memo being shared
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoShare {
    pub channel: ShareChannel,
    pub recipient: String,
    pub shared_by: ActorId,
    pub shared_at: DateTime<Utc>,
}

// ── Workflow Record ──────────────────────────────────────────────────

/// An entity under approval
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: RecordId,
    pub record_type: RecordType,
    pub attributes: RecordAttributes,
    pub state: RecordState,
    /// Position in `resolved_gates`; `None` for ungated records
    pub current_gate_index: Option<usize>,
    /// Frozen at submission
    pub resolved_gates: Vec<GateName>,
    pub audit_trail: AuditTrail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_reason: Option<String>,
    pub submitted_by: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectReceipt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shares: Vec<MemoShare>,
    /// Incremented on every persisted mutation
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowRecord {
    /// Create a pending record positioned at its first gate
    pub fn new(
        id: RecordId,
        attributes: RecordAttributes,
        resolved_gates: Vec<GateName>,
        submitted_by: ActorId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            record_type: attributes.record_type(),
            attributes,
            state: RecordState::Pending,
            current_gate_index: if resolved_gates.is_empty() {
                None
            } else {
                Some(0)
            },
            resolved_gates,
            audit_trail: AuditTrail::new(),
            terminal_reason: None,
            submitted_by,
            effect: None,
            documents: Vec::new(),
            shares: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn magnitude(&self) -> Option<i64> {
        self.attributes.magnitude()
    }

    /// The gate currently awaiting a decision
    pub fn awaiting_gate(&self) -> Option<&GateName> {
        if self.is_terminal() {
            return None;
        }
        self.current_gate_index
            .and_then(|index| self.resolved_gates.get(index))
    }

    pub fn history(&self) -> &[AuditEntry] {
        self.audit_trail.entries()
    }

    /// Move past the current gate. Returns `true` once every gate has passed.
    pub fn advance_gate(&mut self) -> ApprovalResult<bool> {
        if self.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(self.id.clone()));
        }
        let index = self.current_gate_index.ok_or_else(|| {
            ApprovalError::AuditIntegrity(format!("{} has no gate to advance past", self.id))
        })?;
        if index >= self.resolved_gates.len() {
            return Err(ApprovalError::AuditIntegrity(format!(
                "{} gate index {} is past its {} gates",
                self.id,
                index,
                self.resolved_gates.len()
            )));
        }
        let next = index + 1;
        self.current_gate_index = Some(next);
        Ok(next == self.resolved_gates.len())
    }

    /// Move into a terminal state. A record terminates at most once.
    pub fn terminate(&mut self, state: RecordState, reason: Option<String>) -> ApprovalResult<()> {
        if self.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(self.id.clone()));
        }
        if !state.is_terminal() {
            return Err(ApprovalError::AuditIntegrity(format!(
                "{} cannot terminate into '{}'",
                self.id, state
            )));
        }
        let now = Utc::now();
        self.state = state;
        self.terminal_reason = reason;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Bump version and update time after a mutation
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
