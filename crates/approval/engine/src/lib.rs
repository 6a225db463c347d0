//! Approval Workflow Engine
//!
//! A generic, multi-stage conditional approval state machine. A record type
//! plugs in by declaring its gate sequence, the routing predicates that add
//! conditional gates, and the side effect bound to final approval.
//!
//! # Key Properties
//!
//! - Gates are resolved once, at submission, and never re-evaluated
//! - A record's gate index only moves forward
//! - A record reaches a terminal state at most once
//! - Balance and ledger side effects run exactly once, on final approval
//!
//! # Architecture
//!
//! The [`ApprovalEngine`] composes:
//!
//! - [`DefinitionRegistry`]: One workflow definition per record type
//! - [`routing`]: Pure gate resolution from record attributes
//! - [`LedgerAdapter`]: Balance movements and journal postings
//! - [`RecordStore`]: Record persistence with optimistic versioning
//! - [`replay`]: State reconstruction from the audit trail
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use approval_engine::{Actor, ApprovalEngine, EngineConfig, TreasuryLedger};
//! use approval_types::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = EngineConfig::default();
//! let ledger = Arc::new(TreasuryLedger::new(&config.ledger));
//! let engine = ApprovalEngine::with_treasury(&config, ledger).unwrap();
//!
//! let invoice = RecordAttributes::Invoice(InvoiceAttributes {
//!     invoice_number: "INV-2025-001".into(),
//!     vendor_name: Some("Acme".into()),
//!     amount: 50_000,
//!     currency: Currency::Sar,
//!     gl_code: None,
//!     description: None,
//!     due_date: None,
//! });
//! let record = engine.submit(&ActorId::new("requester"), invoice).await.unwrap();
//! assert_eq!(record.resolved_gates.len(), 2);
//!
//! let record = engine
//!     .act(&record.id, &Actor::new("m-1", "manager"), Decision::Approve, None, None)
//!     .await
//!     .unwrap();
//! assert_eq!(record.state, RecordState::Pending);
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod definitions;
pub mod engine;
pub mod ledger;
pub mod registry;
pub mod replay;
pub mod routing;
pub mod store;
pub mod summary;

// Re-export main types
pub use config::{EngineConfig, LedgerConfig, LoggingConfig, RoutingThresholds};
pub use engine::{Actor, ApprovalEngine};
pub use ledger::{Account, AccountType, Direction, LedgerAdapter, TreasuryLedger, TreasurySummary};
pub use registry::DefinitionRegistry;
pub use replay::ReplayedState;
pub use store::{InMemoryRecordStore, RecordFilter, RecordStore, StorageError, StorageResult};
pub use summary::RecordSummary;
