//! Approval Workflow Types
//!
//! Core types for the multi-stage conditional approval workflow: the records
//! that move through gates, the declarative definitions that describe each
//! record type's gates and side effects, and the hash-chained audit trail
//! that records every decision.
//!
//! # Key Types
//!
//! - [`WorkflowRecord`]: An entity under approval with its frozen gate list
//! - [`RecordAttributes`]: Typed payload per record type (invoice, transaction, ...)
//! - [`WorkflowDefinition`]: Gate specs, success state, side effect, cancellability
//! - [`GateCondition`]: Declarative predicate for conditional gates
//! - [`AuditTrail`]: Append-only, hash-chained decision history
//! - [`ApprovalError`]: Error taxonomy shared by the engine and its callers

#![deny(unsafe_code)]

pub mod attributes;
pub mod audit;
pub mod definition;
pub mod errors;
pub mod ids;
pub mod record;

pub use attributes::*;
pub use audit::*;
pub use definition::*;
pub use errors::*;
pub use ids::*;
pub use record::*;
