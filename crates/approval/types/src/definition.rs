//! Workflow definitions: the declarative description a record type plugs
//! into the engine with.

use crate::{ApprovalError, ApprovalResult, GateName, RecordAttributes, RecordState, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Gate Conditions ──────────────────────────────────────────────────

/// Predicate deciding whether a conditional gate is inserted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum GateCondition {
    /// Magnitude strictly greater than the threshold
    MagnitudeAbove(i64),
    /// Magnitude greater than or equal to the threshold
    MagnitudeAtLeast(i64),
    /// Category equals the given value (case-insensitive)
    CategoryIs(String),
    All(Vec<GateCondition>),
    Any(Vec<GateCondition>),
}

impl GateCondition {
    /// Evaluate against record attributes. Records without a magnitude never
    /// satisfy a magnitude predicate.
    pub fn evaluate(&self, attributes: &RecordAttributes) -> bool {
        match self {
            GateCondition::MagnitudeAbove(threshold) => attributes
                .magnitude()
                .map(|m| m > *threshold)
                .unwrap_or(false),
            GateCondition::MagnitudeAtLeast(threshold) => attributes
                .magnitude()
                .map(|m| m >= *threshold)
                .unwrap_or(false),
            GateCondition::CategoryIs(expected) => attributes
                .category()
                .map(|c| c.eq_ignore_ascii_case(expected))
                .unwrap_or(false),
            GateCondition::All(conditions) => conditions.iter().all(|c| c.evaluate(attributes)),
            GateCondition::Any(conditions) => conditions.iter().any(|c| c.evaluate(attributes)),
        }
    }
}

// ── Gate Specs ───────────────────────────────────────────────────────

/// A declared gate. Gates without a condition are mandatory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSpec {
    pub name: GateName,
    /// Label reported while the record waits at this gate
    pub stage_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<GateCondition>,
}

impl GateSpec {
    pub fn mandatory(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            stage_label: format!("pending_{}", name),
            name: GateName(name),
            condition: None,
        }
    }

    pub fn conditional(name: impl Into<String>, condition: GateCondition) -> Self {
        Self {
            condition: Some(condition),
            ..Self::mandatory(name)
        }
    }

    pub fn with_stage_label(mut self, label: impl Into<String>) -> Self {
        self.stage_label = label.into();
        self
    }

    pub fn is_mandatory(&self) -> bool {
        self.condition.is_none()
    }

    pub fn applies_to(&self, attributes: &RecordAttributes) -> bool {
        self.condition
            .as_ref()
            .map(|c| c.evaluate(attributes))
            .unwrap_or(true)
    }
}

// ── Definition ───────────────────────────────────────────────────────

/// Side effect bound to the transition into the success terminal state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    #[default]
    None,
    /// Debit/credit treasury balances
    BalanceMovement,
    /// Allocate a general-ledger journal entry
    JournalPosting,
}

/// Whether numeric adjustments are accepted after submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Adjustability {
    #[default]
    Never,
    /// Any non-terminal state
    WhileInFlight,
}

/// Per-record-type workflow configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub record_type: RecordType,
    /// Declared gates in order, mandatory and conditional interleaved
    pub gates: Vec<GateSpec>,
    pub success_state: RecordState,
    #[serde(default)]
    pub effect: SideEffect,
    /// Pending records with no decisions yet may be cancelled
    #[serde(default)]
    pub cancellable: bool,
    #[serde(default)]
    pub adjustability: Adjustability,
}

impl WorkflowDefinition {
    pub fn new(record_type: RecordType, success_state: RecordState) -> Self {
        Self {
            record_type,
            gates: Vec::new(),
            success_state,
            effect: SideEffect::None,
            cancellable: false,
            adjustability: Adjustability::Never,
        }
    }

    pub fn with_gate(mut self, gate: GateSpec) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }

    pub fn with_adjustability(mut self, adjustability: Adjustability) -> Self {
        self.adjustability = adjustability;
        self
    }

    pub fn gate(&self, name: &GateName) -> Option<&GateSpec> {
        self.gates.iter().find(|g| &g.name == name)
    }

    pub fn stage_label(&self, name: &GateName) -> Option<&str> {
        self.gate(name).map(|g| g.stage_label.as_str())
    }

    pub fn mandatory_gates(&self) -> impl Iterator<Item = &GateSpec> {
        self.gates.iter().filter(|g| g.is_mandatory())
    }

    pub fn is_adjustable(&self) -> bool {
        self.adjustability != Adjustability::Never
    }

    /// Structural validation performed on registration
    pub fn validate(&self) -> ApprovalResult<()> {
        if !self.success_state.is_success_terminal() {
            return Err(ApprovalError::InvalidAttributes(format!(
                "definition for {} names '{}' as its success state",
                self.record_type, self.success_state
            )));
        }

        let mut seen = HashSet::new();
        for gate in &self.gates {
            if gate.name.as_str().trim().is_empty() {
                return Err(ApprovalError::InvalidAttributes(format!(
                    "definition for {} declares an unnamed gate",
                    self.record_type
                )));
            }
            if !seen.insert(&gate.name) {
                return Err(ApprovalError::InvalidAttributes(format!(
                    "definition for {} declares gate '{}' twice",
                    self.record_type, gate.name
                )));
            }
        }

        if self.effect == SideEffect::BalanceMovement && self.record_type != RecordType::Transaction
        {
            return Err(ApprovalError::InvalidAttributes(format!(
                "balance movement is only defined for transactions, not {}",
                self.record_type
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Currency, InvoiceAttributes};

    fn make_invoice(amount: i64, gl_code: Option<&str>) -> RecordAttributes {
        RecordAttributes::Invoice(InvoiceAttributes {
            invoice_number: "INV-2025-010".into(),
            vendor_name: Some("PT Sumber Makmur".into()),
            amount,
            currency: Currency::Idr,
            gl_code: gl_code.map(String::from),
            description: None,
            due_date: None,
        })
    }

    #[test]
    fn test_magnitude_conditions() {
        let at = make_invoice(100_000, None);
        assert!(!GateCondition::MagnitudeAbove(100_000).evaluate(&at));
        assert!(GateCondition::MagnitudeAtLeast(100_000).evaluate(&at));
    }

    #[test]
    fn test_composite_conditions() {
        let attrs = make_invoice(5_000, Some("CAPEX"));
        let capex = GateCondition::CategoryIs("capex".into());
        let big = GateCondition::MagnitudeAbove(10_000);
        assert!(GateCondition::Any(vec![capex.clone(), big.clone()]).evaluate(&attrs));
        assert!(!GateCondition::All(vec![capex, big]).evaluate(&attrs));
    }

    #[test]
    fn test_gate_spec_defaults() {
        let spec = GateSpec::mandatory("manager");
        assert!(spec.is_mandatory());
        assert_eq!(spec.stage_label, "pending_manager");

        let spec = GateSpec::conditional("cfo", GateCondition::MagnitudeAbove(1))
            .with_stage_label("awaiting_cfo");
        assert!(!spec.is_mandatory());
        assert_eq!(spec.stage_label, "awaiting_cfo");
    }

    #[test]
    fn test_validate_rejects_duplicate_gates() {
        let def = WorkflowDefinition::new(RecordType::Invoice, RecordState::Approved)
            .with_gate(GateSpec::mandatory("manager"))
            .with_gate(GateSpec::mandatory("manager"));
        assert!(matches!(def.validate(), Err(ApprovalError::InvalidAttributes(_))));
    }

    #[test]
    fn test_validate_rejects_failure_success_state() {
        let def = WorkflowDefinition::new(RecordType::Leave, RecordState::Rejected)
            .with_gate(GateSpec::mandatory("supervisor"));
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_condition_json_shape() {
        let json = serde_json::to_value(GateCondition::MagnitudeAbove(100_000)).unwrap();
        assert_eq!(json, serde_json::json!({"op": "magnitude_above", "value": 100000}));
    }
}
