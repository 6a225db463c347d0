//! General-ledger journal for posted invoices

use approval_types::{ApprovalError, ApprovalResult, Currency, InvoiceAttributes, RecordId};
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A journal entry allocated for a settled invoice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// e.g. `JE-2025-001`
    pub id: String,
    pub record_id: RecordId,
    pub invoice_number: String,
    pub amount: i64,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gl_code: Option<String>,
    pub posted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversed_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn is_reversed(&self) -> bool {
        self.reversed_at.is_some()
    }
}

/// Allocates journal-entry identifiers, at most one live entry per record
pub struct JournalBook {
    prefix: String,
    fiscal_year: Option<i32>,
    sequence: AtomicU64,
    entries: DashMap<RecordId, JournalEntry>,
}

impl JournalBook {
    pub fn new(prefix: impl Into<String>, fiscal_year: Option<i32>) -> Self {
        Self {
            prefix: prefix.into(),
            fiscal_year,
            sequence: AtomicU64::new(0),
            entries: DashMap::new(),
        }
    }

    /// Post an invoice. Posting an already-posted record returns its live entry.
    pub fn post(&self, record_id: &RecordId, invoice: &InvoiceAttributes) -> JournalEntry {
        let mut slot = self.entries.entry(record_id.clone()).or_insert_with(|| {
            self.allocate(record_id, invoice)
        });
        if slot.is_reversed() {
            *slot = self.allocate(record_id, invoice);
        }
        tracing::info!(record_id = %record_id, journal_entry = %slot.id, "Invoice posted to ledger");
        slot.value().clone()
    }

    /// Mark a record's live entry reversed
    pub fn reverse(&self, record_id: &RecordId) -> ApprovalResult<JournalEntry> {
        let mut slot = self.entries.get_mut(record_id).ok_or_else(|| {
            ApprovalError::Ledger(format!("no journal entry posted for {}", record_id))
        })?;
        if slot.is_reversed() {
            return Err(ApprovalError::Ledger(format!(
                "journal entry {} is already reversed",
                slot.id
            )));
        }
        slot.reversed_at = Some(Utc::now());
        tracing::warn!(record_id = %record_id, journal_entry = %slot.id, "Journal entry reversed");
        Ok(slot.value().clone())
    }

    pub fn get(&self, record_id: &RecordId) -> Option<JournalEntry> {
        self.entries.get(record_id).map(|entry| entry.value().clone())
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        let mut entries: Vec<_> = self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.posted_at.cmp(&b.posted_at).then(a.id.cmp(&b.id)));
        entries
    }

    fn allocate(&self, record_id: &RecordId, invoice: &InvoiceAttributes) -> JournalEntry {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let year = self.fiscal_year.unwrap_or_else(|| now.year());
        JournalEntry {
            id: format!("{}-{}-{:03}", self.prefix, year, sequence),
            record_id: record_id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            amount: invoice.amount,
            currency: invoice.currency,
            gl_code: invoice.gl_code.clone(),
            posted_at: now,
            reversed_at: None,
        }
    }
}
