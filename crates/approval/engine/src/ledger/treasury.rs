//! Treasury ledger: balance movements for transactions and journal postings
//! for invoices.

use super::{Account, AccountType, BalanceBook, Direction, JournalBook, LedgerAdapter};
use crate::config::LedgerConfig;
use approval_types::{
    AccountId, ApprovalError, ApprovalResult, EffectReceipt, RecordAttributes, RecordId,
    SideEffect, TransactionKind,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view over all treasury accounts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasurySummary {
    pub total_balance: i64,
    pub by_account_type: BTreeMap<AccountType, i64>,
    pub account_count: usize,
    pub active_accounts: usize,
}

/// Default [`LedgerAdapter`] backed by in-process books
pub struct TreasuryLedger {
    balances: BalanceBook,
    journal: JournalBook,
}

impl TreasuryLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            balances: BalanceBook::new(),
            journal: JournalBook::new(config.journal_prefix.clone(), config.fiscal_year),
        }
    }

    pub fn with_accounts(
        config: &LedgerConfig,
        accounts: impl IntoIterator<Item = Account>,
    ) -> ApprovalResult<Self> {
        let ledger = Self::new(config);
        for account in accounts {
            ledger.balances.open(account)?;
        }
        Ok(ledger)
    }

    pub fn balances(&self) -> &BalanceBook {
        &self.balances
    }

    pub fn journal(&self) -> &JournalBook {
        &self.journal
    }

    pub fn open_account(&self, account: Account) -> ApprovalResult<()> {
        self.balances.open(account)
    }

    pub async fn balance(&self, account: &AccountId) -> ApprovalResult<i64> {
        self.balances.balance(account).await
    }

    pub async fn summary(&self) -> TreasurySummary {
        let accounts = self.balances.list().await;
        let mut summary = TreasurySummary {
            account_count: accounts.len(),
            ..Default::default()
        };
        for account in accounts.iter().filter(|a| a.is_active) {
            summary.active_accounts += 1;
            summary.total_balance = summary.total_balance.saturating_add(account.balance);
            let by_type = summary
                .by_account_type
                .entry(account.account_type)
                .or_insert(0);
            *by_type = by_type.saturating_add(account.balance);
        }
        summary
    }

    fn movement_deltas(
        movement: &TransactionKind,
        amount: i64,
        direction: Direction,
    ) -> Vec<(AccountId, i64)> {
        let sign = match direction {
            Direction::Apply => 1,
            Direction::Reverse => -1,
        };
        match movement {
            TransactionKind::Deposit { to } => vec![(to.clone(), sign * amount)],
            TransactionKind::Withdrawal { from } => vec![(from.clone(), -sign * amount)],
            TransactionKind::Transfer { from, to } => vec![
                (from.clone(), -sign * amount),
                (to.clone(), sign * amount),
            ],
        }
    }
}

#[async_trait]
impl LedgerAdapter for TreasuryLedger {
    async fn validate(&self, attributes: &RecordAttributes) -> ApprovalResult<()> {
        let RecordAttributes::Transaction(tx) = attributes else {
            return Ok(());
        };

        for account in [tx.movement.debit_account(), tx.movement.credit_account()]
            .into_iter()
            .flatten()
        {
            let snapshot = self.balances.get(account).await.ok_or_else(|| {
                ApprovalError::InvalidAttributes(format!("unknown account {}", account))
            })?;
            if !snapshot.is_active {
                return Err(ApprovalError::InvalidAttributes(format!(
                    "account {} is inactive",
                    account
                )));
            }
        }

        if let Some(from) = tx.movement.debit_account() {
            let balance = self.balances.balance(from).await?;
            if balance < tx.amount {
                return Err(ApprovalError::InsufficientFunds {
                    account: from.clone(),
                    balance,
                    required: tx.amount,
                });
            }
        }
        Ok(())
    }

    async fn apply_effect(
        &self,
        record_id: &RecordId,
        effect: SideEffect,
        attributes: &RecordAttributes,
        direction: Direction,
    ) -> ApprovalResult<EffectReceipt> {
        match (effect, attributes) {
            (SideEffect::BalanceMovement, RecordAttributes::Transaction(tx)) => {
                let deltas = Self::movement_deltas(&tx.movement, tx.amount, direction);
                let postings = self.balances.post(&deltas).await?;
                tracing::info!(
                    record_id = %record_id,
                    movement = tx.movement.as_str(),
                    amount = tx.amount,
                    direction = ?direction,
                    "Balance movement applied"
                );
                Ok(EffectReceipt {
                    effect,
                    reference: format!("MV-{}", record_id),
                    postings,
                    applied_at: Utc::now(),
                })
            }
            (SideEffect::JournalPosting, RecordAttributes::Invoice(invoice)) => {
                let entry = match direction {
                    Direction::Apply => self.journal.post(record_id, invoice),
                    Direction::Reverse => self.journal.reverse(record_id)?,
                };
                Ok(EffectReceipt {
                    effect,
                    reference: entry.id,
                    postings: Vec::new(),
                    applied_at: Utc::now(),
                })
            }
            (SideEffect::None, _) => Ok(EffectReceipt {
                effect,
                reference: String::new(),
                postings: Vec::new(),
                applied_at: Utc::now(),
            }),
            (effect, attributes) => Err(ApprovalError::Ledger(format!(
                "{:?} is not defined for {} records",
                effect,
                attributes.record_type()
            ))),
        }
    }
}
