//! Reconstruct a record's state from its audit trail.
//!
//! The audit trail is the durable log: replaying it against the frozen gate
//! list yields the state and gate index the record must be in. This is how
//! a record whose state fields lag its trail is repaired after a crash.

use approval_types::{
    ApprovalError, ApprovalResult, AuditAction, AuditEntry, GateName, RecordId, RecordState,
    WorkflowDefinition,
};

/// State derived purely from the audit trail
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayedState {
    pub state: RecordState,
    pub current_gate_index: Option<usize>,
    /// Sum of all adjustment deltas
    pub adjustment_total: i64,
}

pub fn replay(
    record_id: &RecordId,
    definition: &WorkflowDefinition,
    resolved_gates: &[GateName],
    entries: &[AuditEntry],
) -> ApprovalResult<ReplayedState> {
    let mut replayed = if resolved_gates.is_empty() {
        ReplayedState {
            state: definition.success_state,
            current_gate_index: None,
            adjustment_total: 0,
        }
    } else {
        ReplayedState {
            state: RecordState::Pending,
            current_gate_index: Some(0),
            adjustment_total: 0,
        }
    };

    for entry in entries {
        if replayed.state.is_terminal() {
            return Err(integrity(record_id, entry, "follows a terminal transition"));
        }

        match &entry.action {
            AuditAction::Approve | AuditAction::Reject => {
                let index = replayed.current_gate_index.unwrap_or(0);
                let expected = resolved_gates
                    .get(index)
                    .ok_or_else(|| integrity(record_id, entry, "decides past the last gate"))?;
                if entry.gate.as_ref() != Some(expected) {
                    return Err(integrity(record_id, entry, "decides out of gate order"));
                }
                if entry.action == AuditAction::Approve {
                    let next = index + 1;
                    replayed.current_gate_index = Some(next);
                    if next == resolved_gates.len() {
                        replayed.state = definition.success_state;
                    }
                } else {
                    replayed.state = RecordState::Rejected;
                }
            }
            AuditAction::Cancel => {
                if entry.sequence != 0 {
                    return Err(integrity(record_id, entry, "cancels after other activity"));
                }
                replayed.state = RecordState::Cancelled;
            }
            AuditAction::Adjust { delta } => {
                replayed.adjustment_total = replayed
                    .adjustment_total
                    .checked_add(*delta)
                    .ok_or_else(|| integrity(record_id, entry, "overflows the adjustment total"))?;
            }
        }
    }

    Ok(replayed)
}

fn integrity(record_id: &RecordId, entry: &AuditEntry, what: &str) -> ApprovalError {
    ApprovalError::AuditIntegrity(format!(
        "entry {} of {} {}",
        entry.sequence, record_id, what
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingThresholds;
    use crate::definitions;
    use approval_types::*;

    fn gates(names: &[&str]) -> Vec<GateName> {
        names.iter().map(|n| GateName::from(*n)).collect()
    }

    fn decide(trail: &mut AuditTrail, id: &RecordId, gate: &str, decision: Decision) {
        let comment = match decision {
            Decision::Approve => None,
            Decision::Reject => Some("no budget".to_string()),
        };
        trail.append(
            id,
            AuditDraft::decision(GateName::from(gate), ActorId::new("a"), decision, comment, None),
        );
    }

    #[test]
    fn test_replay_full_approval() {
        let def = definitions::invoice(&RoutingThresholds::default());
        let id = RecordId::new("INV-000001");
        let resolved = gates(&["manager", "finance"]);
        let mut trail = AuditTrail::new();
        decide(&mut trail, &id, "manager", Decision::Approve);

        let mid = replay(&id, &def, &resolved, trail.entries()).unwrap();
        assert_eq!(mid.state, RecordState::Pending);
        assert_eq!(mid.current_gate_index, Some(1));

        decide(&mut trail, &id, "finance", Decision::Approve);
        let done = replay(&id, &def, &resolved, trail.entries()).unwrap();
        assert_eq!(done.state, RecordState::Approved);
        assert_eq!(done.current_gate_index, Some(2));
    }

    #[test]
    fn test_replay_rejection_keeps_index() {
        let def = definitions::leave(&RoutingThresholds::default());
        let id = RecordId::new("LV-000001");
        let mut trail = AuditTrail::new();
        decide(&mut trail, &id, "supervisor", Decision::Reject);
        let replayed = replay(&id, &def, &gates(&["supervisor"]), trail.entries()).unwrap();
        assert_eq!(replayed.state, RecordState::Rejected);
        assert_eq!(replayed.current_gate_index, Some(0));
    }

    #[test]
    fn test_replay_detects_out_of_order_decision() {
        let def = definitions::invoice(&RoutingThresholds::default());
        let id = RecordId::new("INV-000002");
        let mut trail = AuditTrail::new();
        decide(&mut trail, &id, "finance", Decision::Approve);
        assert!(matches!(
            replay(&id, &def, &gates(&["manager", "finance"]), trail.entries()),
            Err(ApprovalError::AuditIntegrity(_))
        ));
    }

    #[test]
    fn test_replay_detects_activity_after_terminal() {
        let def = definitions::leave(&RoutingThresholds::default());
        let id = RecordId::new("LV-000002");
        let mut trail = AuditTrail::new();
        decide(&mut trail, &id, "supervisor", Decision::Approve);
        decide(&mut trail, &id, "supervisor", Decision::Approve);
        assert!(replay(&id, &def, &gates(&["supervisor"]), trail.entries()).is_err());
    }

    #[test]
    fn test_replay_sums_adjustments() {
        let def = definitions::payroll();
        let id = RecordId::new("PAY-000001");
        let mut trail = AuditTrail::new();
        trail.append(&id, AuditDraft::adjust(ActorId::new("hr"), 500, "bonus", None));
        trail.append(&id, AuditDraft::adjust(ActorId::new("hr"), -200, "late", None));
        let replayed = replay(&id, &def, &gates(&["hr", "finance"]), trail.entries()).unwrap();
        assert_eq!(replayed.adjustment_total, 300);
        assert_eq!(replayed.state, RecordState::Pending);
    }
}
