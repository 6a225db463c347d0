//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use approval_engine::*;
use approval_types::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn make_ledger(accounts: &[(&str, i64)]) -> Arc<TreasuryLedger> {
    let config = LedgerConfig {
        journal_prefix: "JE".into(),
        fiscal_year: Some(2025),
    };
    Arc::new(
        TreasuryLedger::with_accounts(
            &config,
            accounts
                .iter()
                .map(|(id, balance)| Account::new(*id, AccountType::Operating, *balance)),
        )
        .expect("accounts open"),
    )
}

pub fn make_engine(accounts: &[(&str, i64)]) -> (ApprovalEngine, Arc<TreasuryLedger>) {
    let ledger = make_ledger(accounts);
    let engine =
        ApprovalEngine::with_treasury(&EngineConfig::default(), ledger.clone()).expect("engine");
    (engine, ledger)
}

pub fn invoice(amount: i64) -> RecordAttributes {
    RecordAttributes::Invoice(InvoiceAttributes {
        invoice_number: format!("INV-2025-{}", amount),
        vendor_name: Some("Al Noor Trading".into()),
        amount,
        currency: Currency::Sar,
        gl_code: Some("5200".into()),
        description: Some("office fit-out".into()),
        due_date: NaiveDate::from_ymd_opt(2025, 4, 30),
    })
}

pub fn transfer(from: &str, to: &str, amount: i64) -> RecordAttributes {
    RecordAttributes::Transaction(TransactionAttributes {
        movement: TransactionKind::Transfer {
            from: AccountId::new(from),
            to: AccountId::new(to),
        },
        amount,
        currency: Currency::Sar,
        description: "sweep".into(),
        reference: "TRF-001".into(),
    })
}

pub fn withdrawal(from: &str, amount: i64) -> RecordAttributes {
    RecordAttributes::Transaction(TransactionAttributes {
        movement: TransactionKind::Withdrawal {
            from: AccountId::new(from),
        },
        amount,
        currency: Currency::Sar,
        description: "vendor payout".into(),
        reference: "WDR-001".into(),
    })
}

pub fn investment(memo: Option<&str>) -> RecordAttributes {
    RecordAttributes::Investment(InvestmentAttributes {
        company_name: "Gulf Renewables".into(),
        investment_amount: Some(5_000_000),
        sector: Some("energy".into()),
        final_memo: memo.map(String::from),
    })
}

pub fn payroll(basic: i64) -> RecordAttributes {
    RecordAttributes::Payroll(PayrollAttributes {
        employee_id: "EMP007".into(),
        employee_name: "Huda".into(),
        period: "2025-03".into(),
        basic_salary: basic,
        allowances: 2_000,
        overtime_pay: 500,
        deductions: 1_000,
        adjustments: 0,
    })
}

pub fn requester() -> ActorId {
    ActorId::new("requester-1")
}

pub async fn approve(engine: &ApprovalEngine, id: &RecordId, role: &str) -> WorkflowRecord {
    engine
        .act(
            id,
            &Actor::new(format!("{}-1", role), role),
            Decision::Approve,
            None,
            None,
        )
        .await
        .expect("approval accepted")
}

/// Store that can be told to fail every update
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryRecordStore,
    fail_updates: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_updates.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn reserve_id(&self, record_type: RecordType) -> StorageResult<RecordId> {
        self.inner.reserve_id(record_type).await
    }

    async fn insert(&self, record: WorkflowRecord) -> StorageResult<()> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: &RecordId) -> StorageResult<Option<WorkflowRecord>> {
        self.inner.get(id).await
    }

    async fn update(&self, record: WorkflowRecord, expected_version: u64) -> StorageResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("simulated outage".into()));
        }
        self.inner.update(record, expected_version).await
    }

    async fn list(&self, filter: &RecordFilter) -> StorageResult<Vec<WorkflowRecord>> {
        self.inner.list(filter).await
    }
}
