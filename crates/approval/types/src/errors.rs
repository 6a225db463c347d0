//! Approval workflow error types

use crate::{AccountId, GateName, RecordId, RequestToken};
use thiserror::Error;

/// Errors that can occur while routing, deciding or settling a record
///
/// Every variant is recoverable at the call site. A failed operation leaves
/// the record's state, gate index, audit trail and balances unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Invalid attributes: {0}")]
    InvalidAttributes(String),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Record {0} is already in a terminal state")]
    AlreadyTerminal(RecordId),

    #[error("Gate mismatch: record is awaiting '{expected}', actor acted as '{actual}'")]
    GateMismatch { expected: GateName, actual: GateName },

    #[error("A non-empty reason is required: {0}")]
    MissingReason(String),

    #[error("Record {0} cannot be cancelled")]
    NotCancellable(RecordId),

    #[error("Record {0} cannot be adjusted")]
    NotAdjustable(RecordId),

    #[error("Insufficient funds in account {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        required: i64,
    },

    #[error("Request token {0} was already used for a different action")]
    DuplicateRequest(RequestToken),

    #[error("Audit trail integrity violation: {0}")]
    AuditIntegrity(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ApprovalError {
    pub fn gate_mismatch(expected: &GateName, actual: &GateName) -> Self {
        Self::GateMismatch {
            expected: expected.clone(),
            actual: actual.clone(),
        }
    }

    /// Expected, user-facing conditions that callers surface verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::GateMismatch { .. }
                | Self::MissingReason(_)
                | Self::InvalidAttributes(_)
        )
    }
}

/// Result type for approval workflow operations
pub type ApprovalResult<T> = Result<T, ApprovalError>;
