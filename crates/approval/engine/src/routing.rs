//! Routing policy evaluator: maps record attributes to the ordered list of
//! gates a record must pass.
//!
//! Resolution is pure and deterministic. Mandatory gates always appear in
//! declared order; conditional gates appear at their declared position only
//! when their predicate holds.

use approval_types::{ApprovalError, ApprovalResult, GateName, RecordAttributes, WorkflowDefinition};

/// Resolve the gate list for `attributes` under `definition`.
pub fn resolve_gates(
    definition: &WorkflowDefinition,
    attributes: &RecordAttributes,
) -> ApprovalResult<Vec<GateName>> {
    if attributes.record_type() != definition.record_type {
        return Err(ApprovalError::InvalidAttributes(format!(
            "{} attributes given to the {} workflow",
            attributes.record_type(),
            definition.record_type
        )));
    }

    let gates: Vec<GateName> = definition
        .gates
        .iter()
        .filter(|spec| spec.applies_to(attributes))
        .map(|spec| spec.name.clone())
        .collect();

    tracing::debug!(
        record_type = %definition.record_type,
        magnitude = ?attributes.magnitude(),
        gates = ?gates,
        "Gates resolved"
    );

    Ok(gates)
}

/// A definition is gated when at least one gate is unconditional. Gated
/// definitions never resolve to an empty list.
pub fn is_gated(definition: &WorkflowDefinition) -> bool {
    definition.mandatory_gates().next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingThresholds;
    use crate::definitions;
    use approval_types::*;

    fn make_invoice(amount: i64) -> RecordAttributes {
        RecordAttributes::Invoice(InvoiceAttributes {
            invoice_number: "INV-2025-100".into(),
            vendor_name: Some("Acme Supplies".into()),
            amount,
            currency: Currency::Sar,
            gl_code: Some("5100".into()),
            description: None,
            due_date: None,
        })
    }

    fn names(gates: &[GateName]) -> Vec<&str> {
        gates.iter().map(|g| g.as_str()).collect()
    }

    #[test]
    fn test_high_value_invoice_adds_cfo() {
        let def = definitions::invoice(&RoutingThresholds::default());
        let gates = resolve_gates(&def, &make_invoice(150_000)).unwrap();
        assert_eq!(names(&gates), vec!["manager", "finance", "cfo"]);
    }

    #[test]
    fn test_low_value_invoice_skips_cfo() {
        let def = definitions::invoice(&RoutingThresholds::default());
        let gates = resolve_gates(&def, &make_invoice(50_000)).unwrap();
        assert_eq!(names(&gates), vec!["manager", "finance"]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let def = definitions::invoice(&RoutingThresholds::default());
        let gates = resolve_gates(&def, &make_invoice(100_000)).unwrap();
        assert_eq!(gates.len(), 2);
    }

    #[test]
    fn test_conditional_gate_keeps_declared_position() {
        let def = WorkflowDefinition::new(RecordType::Invoice, RecordState::Approved)
            .with_gate(GateSpec::mandatory("manager"))
            .with_gate(GateSpec::conditional(
                "procurement",
                GateCondition::CategoryIs("5100".into()),
            ))
            .with_gate(GateSpec::mandatory("finance"));
        let gates = resolve_gates(&def, &make_invoice(10)).unwrap();
        assert_eq!(names(&gates), vec!["manager", "procurement", "finance"]);
    }

    #[test]
    fn test_mismatched_attributes_rejected() {
        let def = definitions::payroll();
        assert!(matches!(
            resolve_gates(&def, &make_invoice(10)),
            Err(ApprovalError::InvalidAttributes(_))
        ));
    }

    #[test]
    fn test_builtin_definitions_are_gated() {
        for def in definitions::builtin(&RoutingThresholds::default()) {
            assert!(is_gated(&def), "{} should be gated", def.record_type);
        }
    }
}
