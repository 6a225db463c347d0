//! Ledger/balance adapter: the side effect bound to a record's transition
//! into its success state.
//!
//! The engine calls the adapter at most once per record with
//! [`Direction::Apply`], and only if persisting the settled record fails does
//! it call back with [`Direction::Reverse`] to compensate.

pub mod balances;
pub mod journal;
pub mod treasury;

pub use balances::{Account, AccountType, BalanceBook};
pub use journal::{JournalBook, JournalEntry};
pub use treasury::{TreasuryLedger, TreasurySummary};

use approval_types::{ApprovalResult, EffectReceipt, RecordAttributes, RecordId, SideEffect};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Whether an effect is being applied or compensated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Apply,
    Reverse,
}

/// Applies monetary side effects for settled records
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Submission-time checks: referenced accounts exist and can cover debits.
    /// Funds are checked again when the effect is applied.
    async fn validate(&self, attributes: &RecordAttributes) -> ApprovalResult<()>;

    /// Apply or reverse `effect` for a record. Either every balance change
    /// lands or none does.
    async fn apply_effect(
        &self,
        record_id: &RecordId,
        effect: SideEffect,
        attributes: &RecordAttributes,
        direction: Direction,
    ) -> ApprovalResult<EffectReceipt>;
}
