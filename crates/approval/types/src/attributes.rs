//! Record types and their typed attribute payloads.
//!
//! Routing predicates read two derived values from any payload: the
//! `magnitude` (amount, days or net salary) and an optional `category`.

use crate::{AccountId, ApprovalError, ApprovalResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Record Type ──────────────────────────────────────────────────────

/// The kinds of records that can be placed under approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Invoice,
    Transaction,
    Investment,
    Leave,
    Payroll,
}

impl RecordType {
    pub const ALL: [RecordType; 5] = [
        RecordType::Invoice,
        RecordType::Transaction,
        RecordType::Investment,
        RecordType::Leave,
        RecordType::Payroll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Invoice => "invoice",
            RecordType::Transaction => "transaction",
            RecordType::Investment => "investment",
            RecordType::Leave => "leave",
            RecordType::Payroll => "payroll",
        }
    }

    /// Prefix used when reserving record identifiers
    pub fn id_prefix(&self) -> &'static str {
        match self {
            RecordType::Invoice => "INV",
            RecordType::Transaction => "TRX",
            RecordType::Investment => "IVS",
            RecordType::Leave => "LV",
            RecordType::Payroll => "PAY",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ApprovalError::UnknownRecordType(s.to_string()))
    }
}

/// Settlement currency. No conversion is ever performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Sar,
    Idr,
    Usd,
}

// ── Invoice ──────────────────────────────────────────────────────────

/// Vendor invoice awaiting approval and posting to the general ledger
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceAttributes {
    pub invoice_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gl_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

// ── Treasury Transaction ─────────────────────────────────────────────

/// Direction of money movement for a treasury transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit { to: AccountId },
    Withdrawal { from: AccountId },
    Transfer { from: AccountId, to: AccountId },
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit { .. } => "deposit",
            TransactionKind::Withdrawal { .. } => "withdrawal",
            TransactionKind::Transfer { .. } => "transfer",
        }
    }

    /// The account debited when the movement executes, if any
    pub fn debit_account(&self) -> Option<&AccountId> {
        match self {
            TransactionKind::Deposit { .. } => None,
            TransactionKind::Withdrawal { from } | TransactionKind::Transfer { from, .. } => {
                Some(from)
            }
        }
    }

    /// The account credited when the movement executes, if any
    pub fn credit_account(&self) -> Option<&AccountId> {
        match self {
            TransactionKind::Withdrawal { .. } => None,
            TransactionKind::Deposit { to } | TransactionKind::Transfer { to, .. } => Some(to),
        }
    }
}

/// Treasury deposit, withdrawal or transfer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionAttributes {
    pub movement: TransactionKind,
    pub amount: i64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reference: String,
}

// ── Investment ───────────────────────────────────────────────────────

/// Investment proposal moving through due diligence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAttributes {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_memo: Option<String>,
}

// ── Leave ────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Emergency,
    Unpaid,
    Maternity,
    Paternity,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Emergency => "emergency",
            LeaveType::Unpaid => "unpaid",
            LeaveType::Maternity => "maternity",
            LeaveType::Paternity => "paternity",
        }
    }
}

/// Employee leave request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaveAttributes {
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
}

impl LeaveAttributes {
    /// Calendar days requested, both ends inclusive
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

// ── Payroll ──────────────────────────────────────────────────────────

/// A single employee's payroll run for one period
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayrollAttributes {
    pub employee_id: String,
    #[serde(default)]
    pub employee_name: String,
    pub period: String,
    pub basic_salary: i64,
    #[serde(default)]
    pub allowances: i64,
    #[serde(default)]
    pub overtime_pay: i64,
    #[serde(default)]
    pub deductions: i64,
    /// Net of all bonuses and deductions applied after submission
    #[serde(default)]
    pub adjustments: i64,
}

impl PayrollAttributes {
    /// The single authoritative net salary computation. `None` if the
    /// components overflow.
    pub fn net_salary(&self) -> Option<i64> {
        self.basic_salary
            .checked_add(self.allowances)?
            .checked_add(self.overtime_pay)?
            .checked_add(self.adjustments)?
            .checked_sub(self.deductions)
    }
}

// ── Record Attributes ────────────────────────────────────────────────

/// Typed attributes of a record, tagged by record type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum RecordAttributes {
    Invoice(InvoiceAttributes),
    Transaction(TransactionAttributes),
    Investment(InvestmentAttributes),
    Leave(LeaveAttributes),
    Payroll(PayrollAttributes),
}

impl RecordAttributes {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordAttributes::Invoice(_) => RecordType::Invoice,
            RecordAttributes::Transaction(_) => RecordType::Transaction,
            RecordAttributes::Investment(_) => RecordType::Investment,
            RecordAttributes::Leave(_) => RecordType::Leave,
            RecordAttributes::Payroll(_) => RecordType::Payroll,
        }
    }

    /// Numeric value read by routing predicates
    pub fn magnitude(&self) -> Option<i64> {
        match self {
            RecordAttributes::Invoice(a) => Some(a.amount),
            RecordAttributes::Transaction(a) => Some(a.amount),
            RecordAttributes::Investment(a) => a.investment_amount,
            RecordAttributes::Leave(a) => Some(a.days()),
            RecordAttributes::Payroll(a) => a.net_salary(),
        }
    }

    /// Categorical value read by routing predicates
    pub fn category(&self) -> Option<&str> {
        match self {
            RecordAttributes::Invoice(a) => a.gl_code.as_deref(),
            RecordAttributes::Transaction(a) => Some(a.movement.as_str()),
            RecordAttributes::Investment(a) => a.sector.as_deref(),
            RecordAttributes::Leave(a) => Some(a.leave_type.as_str()),
            RecordAttributes::Payroll(_) => None,
        }
    }

    /// Amount that counts toward pending/approved money totals
    pub fn monetary_amount(&self) -> Option<i64> {
        match self {
            RecordAttributes::Invoice(a) => Some(a.amount),
            RecordAttributes::Transaction(a) => Some(a.amount),
            RecordAttributes::Investment(a) => a.investment_amount,
            RecordAttributes::Leave(_) => None,
            RecordAttributes::Payroll(a) => a.net_salary(),
        }
    }

    /// Check the structural requirements of the payload
    pub fn validate(&self) -> ApprovalResult<()> {
        match self {
            RecordAttributes::Invoice(a) => {
                require_text("invoice_number", &a.invoice_number)?;
                require_non_negative("amount", a.amount)
            }
            RecordAttributes::Transaction(a) => {
                if a.amount <= 0 {
                    return Err(ApprovalError::InvalidAttributes(format!(
                        "transaction amount must be positive, got {}",
                        a.amount
                    )));
                }
                if let TransactionKind::Transfer { from, to } = &a.movement {
                    if from == to {
                        return Err(ApprovalError::InvalidAttributes(format!(
                            "transfer source and destination are both {}",
                            from
                        )));
                    }
                }
                Ok(())
            }
            RecordAttributes::Investment(a) => {
                require_text("company_name", &a.company_name)?;
                match a.investment_amount {
                    Some(amount) => require_non_negative("investment_amount", amount),
                    None => Ok(()),
                }
            }
            RecordAttributes::Leave(a) => {
                require_text("employee_id", &a.employee_id)?;
                if a.end_date < a.start_date {
                    return Err(ApprovalError::InvalidAttributes(format!(
                        "leave ends ({}) before it starts ({})",
                        a.end_date, a.start_date
                    )));
                }
                Ok(())
            }
            RecordAttributes::Payroll(a) => {
                require_text("employee_id", &a.employee_id)?;
                require_text("period", &a.period)?;
                require_non_negative("basic_salary", a.basic_salary)?;
                require_non_negative("allowances", a.allowances)?;
                require_non_negative("overtime_pay", a.overtime_pay)?;
                require_non_negative("deductions", a.deductions)?;
                let net = a.net_salary().ok_or_else(|| {
                    ApprovalError::InvalidAttributes(format!(
                        "net salary of {} for {} is out of range",
                        a.employee_id, a.period
                    ))
                })?;
                require_non_negative("net_salary", net)
            }
        }
    }
}

fn require_text(field: &str, value: &str) -> ApprovalResult<()> {
    if value.trim().is_empty() {
        return Err(ApprovalError::InvalidAttributes(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: i64) -> ApprovalResult<()> {
    if value < 0 {
        return Err(ApprovalError::InvalidAttributes(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    Ok(())
}
