//! Treasury account balances.
//!
//! Each account sits behind its own async mutex. Multi-account postings lock
//! every involved account in ascending id order, so two transfers touching
//! the same pair of accounts cannot deadlock or lose an update.

use approval_types::{AccountId, ApprovalError, ApprovalResult, BalancePosting, Currency};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Operating,
    Savings,
    Investment,
    Payroll,
}

/// A treasury bank account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub bank_name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub currency: Currency,
    pub balance: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Account {
    pub fn new(id: impl Into<String>, account_type: AccountType, balance: i64) -> Self {
        Self {
            id: AccountId::new(id),
            account_number: String::new(),
            bank_name: String::new(),
            account_type,
            currency: Currency::default(),
            balance,
            is_active: true,
        }
    }
}

/// Account balances keyed by account id
#[derive(Default)]
pub struct BalanceBook {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, account: Account) -> ApprovalResult<()> {
        if account.balance < 0 {
            return Err(ApprovalError::InvalidAttributes(format!(
                "account {} cannot open with a negative balance",
                account.id
            )));
        }
        match self.accounts.entry(account.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ApprovalError::Ledger(format!(
                "account {} already exists",
                account.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                tracing::info!(account = %account.id, balance = account.balance, "Account opened");
                slot.insert(Arc::new(Mutex::new(account)));
                Ok(())
            }
        }
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    pub async fn get(&self, id: &AccountId) -> Option<Account> {
        let handle = self.handle(id).ok()?;
        let account = handle.lock().await;
        Some(account.clone())
    }

    pub async fn balance(&self, id: &AccountId) -> ApprovalResult<i64> {
        let handle = self.handle(id)?;
        let account = handle.lock().await;
        Ok(account.balance)
    }

    /// Snapshot of every account, ordered by id
    pub async fn list(&self) -> Vec<Account> {
        let handles: BTreeMap<AccountId, Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut accounts = Vec::with_capacity(handles.len());
        for handle in handles.values() {
            accounts.push(handle.lock().await.clone());
        }
        accounts
    }

    /// Apply signed deltas atomically. Fails without changing anything if an
    /// account is unknown, inactive, would go negative or would overflow.
    pub async fn post(&self, deltas: &[(AccountId, i64)]) -> ApprovalResult<Vec<BalancePosting>> {
        let mut net: BTreeMap<AccountId, i64> = BTreeMap::new();
        for (account, delta) in deltas {
            let slot = net.entry(account.clone()).or_insert(0);
            *slot = slot.checked_add(*delta).ok_or_else(|| {
                ApprovalError::Ledger(format!("postings to account {} overflow", account))
            })?;
        }

        // BTreeMap iteration gives the ascending lock order
        let mut guards: BTreeMap<AccountId, OwnedMutexGuard<Account>> = BTreeMap::new();
        for id in net.keys() {
            let handle = self.handle(id)?;
            guards.insert(id.clone(), handle.lock_owned().await);
        }

        let mut postings = Vec::with_capacity(net.len());
        for (id, delta) in &net {
            let account = &guards[id];
            if !account.is_active {
                return Err(ApprovalError::Ledger(format!("account {} is inactive", id)));
            }
            let balance_after = account.balance.checked_add(*delta).ok_or_else(|| {
                ApprovalError::Ledger(format!(
                    "balance of account {} would overflow (balance {}, delta {})",
                    id, account.balance, delta
                ))
            })?;
            if balance_after < 0 {
                return Err(ApprovalError::InsufficientFunds {
                    account: id.clone(),
                    balance: account.balance,
                    required: delta.saturating_neg(),
                });
            }
            postings.push(BalancePosting {
                account: id.clone(),
                delta: *delta,
                balance_after,
            });
        }

        for posting in &postings {
            if let Some(account) = guards.get_mut(&posting.account) {
                account.balance = posting.balance_after;
            }
        }

        tracing::debug!(postings = postings.len(), "Balances posted");
        Ok(postings)
    }

    fn handle(&self, id: &AccountId) -> ApprovalResult<Arc<Mutex<Account>>> {
        self.accounts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ApprovalError::InvalidAttributes(format!("unknown account {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_book() -> BalanceBook {
        let book = BalanceBook::new();
        book.open(Account::new("ACC-A", AccountType::Operating, 100_000))
            .unwrap();
        book.open(Account::new("ACC-B", AccountType::Savings, 0))
            .unwrap();
        book
    }

    #[tokio::test]
    async fn test_transfer_moves_both_balances() {
        let book = make_book();
        let a = AccountId::new("ACC-A");
        let b = AccountId::new("ACC-B");
        let postings = book
            .post(&[(a.clone(), -100_000), (b.clone(), 100_000)])
            .await
            .unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(book.balance(&a).await.unwrap(), 0);
        assert_eq!(book.balance(&b).await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_overdraft_changes_nothing() {
        let book = make_book();
        let a = AccountId::new("ACC-A");
        let b = AccountId::new("ACC-B");
        let result = book.post(&[(a.clone(), -100_001), (b.clone(), 100_001)]).await;
        assert!(matches!(result, Err(ApprovalError::InsufficientFunds { .. })));
        assert_eq!(book.balance(&a).await.unwrap(), 100_000);
        assert_eq!(book.balance(&b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_overflowing_credit_changes_nothing() {
        let book = make_book();
        let a = AccountId::new("ACC-A");
        let b = AccountId::new("ACC-B");
        let result = book
            .post(&[(b.clone(), -1), (a.clone(), i64::MAX)])
            .await;
        assert!(matches!(result, Err(ApprovalError::Ledger(_))));
        assert_eq!(book.balance(&a).await.unwrap(), 100_000);
        assert_eq!(book.balance(&b).await.unwrap(), 0);

        let result = book
            .post(&[(a.clone(), i64::MAX), (a.clone(), 1)])
            .await;
        assert!(matches!(result, Err(ApprovalError::Ledger(_))));
        assert_eq!(book.balance(&a).await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_unknown_account_changes_nothing() {
        let book = make_book();
        let a = AccountId::new("ACC-A");
        let result = book
            .post(&[(a.clone(), -10), (AccountId::new("ACC-Z"), 10)])
            .await;
        assert!(matches!(result, Err(ApprovalError::InvalidAttributes(_))));
        assert_eq!(book.balance(&a).await.unwrap(), 100_000);
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let book = make_book();
        assert!(book
            .open(Account::new("ACC-A", AccountType::Operating, 1))
            .is_err());
        assert_eq!(book.list().await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opposite_transfers_conserve_total() {
        let book = Arc::new(make_book());
        let a = AccountId::new("ACC-A");
        let b = AccountId::new("ACC-B");

        let mut handles = Vec::new();
        for i in 0..50 {
            let book = book.clone();
            let (from, to) = if i % 2 == 0 {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            handles.push(tokio::spawn(async move {
                let _ = book.post(&[(from, -1_000), (to, 1_000)]).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let total = book.balance(&a).await.unwrap() + book.balance(&b).await.unwrap();
        assert_eq!(total, 100_000);
    }
}
