//! Built-in workflow definitions for the five record types.

use crate::config::RoutingThresholds;
use approval_types::{
    Adjustability, GateCondition, GateSpec, RecordState, RecordType, SideEffect,
    WorkflowDefinition,
};

/// manager → finance → cfo (above threshold); posts to the general ledger
///
/// There is no separate approved → posted step: the journal entry is
/// allocated as the record enters `approved` and travels in its effect
/// receipt. `RecordState::Posted` is left for definitions whose success
/// state is the posting itself.
pub fn invoice(thresholds: &RoutingThresholds) -> WorkflowDefinition {
    WorkflowDefinition::new(RecordType::Invoice, RecordState::Approved)
        .with_gate(GateSpec::mandatory("manager"))
        .with_gate(GateSpec::mandatory("finance"))
        .with_gate(GateSpec::conditional(
            "cfo",
            GateCondition::MagnitudeAbove(thresholds.invoice_cfo_threshold),
        ))
        .with_effect(SideEffect::JournalPosting)
        .cancellable(true)
}

/// treasury → cfo (above threshold); moves balances on completion
pub fn transaction(thresholds: &RoutingThresholds) -> WorkflowDefinition {
    WorkflowDefinition::new(RecordType::Transaction, RecordState::Completed)
        .with_gate(GateSpec::mandatory("treasury"))
        .with_gate(GateSpec::conditional(
            "cfo",
            GateCondition::MagnitudeAbove(thresholds.transaction_cfo_threshold),
        ))
        .with_effect(SideEffect::BalanceMovement)
        .cancellable(true)
}

/// analysis → review → approval; no cancellation once submitted
pub fn investment() -> WorkflowDefinition {
    WorkflowDefinition::new(RecordType::Investment, RecordState::Approved)
        .with_gate(GateSpec::mandatory("analysis").with_stage_label("pending_analysis"))
        .with_gate(GateSpec::mandatory("review").with_stage_label("pending_review"))
        .with_gate(GateSpec::mandatory("approval").with_stage_label("pending_approval"))
}

/// supervisor → hr (longer than threshold days)
pub fn leave(thresholds: &RoutingThresholds) -> WorkflowDefinition {
    WorkflowDefinition::new(RecordType::Leave, RecordState::Approved)
        .with_gate(GateSpec::mandatory("supervisor"))
        .with_gate(GateSpec::conditional(
            "hr",
            GateCondition::MagnitudeAbove(thresholds.leave_hr_threshold_days),
        ))
        .cancellable(true)
}

/// hr (pending) → finance (processing) → paid; adjustable until paid
pub fn payroll() -> WorkflowDefinition {
    WorkflowDefinition::new(RecordType::Payroll, RecordState::Paid)
        .with_gate(GateSpec::mandatory("hr").with_stage_label("pending"))
        .with_gate(GateSpec::mandatory("finance").with_stage_label("processing"))
        .cancellable(true)
        .with_adjustability(Adjustability::WhileInFlight)
}

pub fn builtin(thresholds: &RoutingThresholds) -> Vec<WorkflowDefinition> {
    vec![
        invoice(thresholds),
        transaction(thresholds),
        investment(),
        leave(thresholds),
        payroll(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_definitions_validate() {
        let defs = builtin(&RoutingThresholds::default());
        assert_eq!(defs.len(), 5);
        for def in &defs {
            def.validate().unwrap();
        }
    }

    #[test]
    fn test_investment_stage_labels() {
        let def = investment();
        let labels: Vec<_> = def.gates.iter().map(|g| g.stage_label.as_str()).collect();
        assert_eq!(labels, vec!["pending_analysis", "pending_review", "pending_approval"]);
        assert!(!def.cancellable);
    }

    #[test]
    fn test_invoice_posts_on_entering_approved() {
        let def = invoice(&RoutingThresholds::default());
        assert_eq!(def.success_state, RecordState::Approved);
        assert_eq!(def.effect, SideEffect::JournalPosting);
        assert!(builtin(&RoutingThresholds::default())
            .iter()
            .all(|d| d.success_state != RecordState::Posted));
    }

    #[test]
    fn test_thresholds_flow_into_conditions() {
        let thresholds = RoutingThresholds {
            invoice_cfo_threshold: 7,
            ..Default::default()
        };
        let def = invoice(&thresholds);
        assert_eq!(
            def.gates[2].condition,
            Some(GateCondition::MagnitudeAbove(7))
        );
    }
}
