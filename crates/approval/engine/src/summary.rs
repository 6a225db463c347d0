//! Dashboard-style aggregates over a set of records.

use crate::registry::DefinitionRegistry;
use approval_types::{RecordState, RecordType, WorkflowRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts and money totals for a set of records
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    pub total: usize,
    pub by_state: BTreeMap<RecordState, usize>,
    /// Pending records grouped by the stage label of their current gate
    pub by_stage: BTreeMap<String, usize>,
    pub pending_amount: i64,
    pub settled_amount: i64,
}

impl RecordSummary {
    pub fn count(&self, state: RecordState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Stage label for a record: the current gate's label while pending, the
/// state name otherwise
pub fn stage_label(registry: &DefinitionRegistry, record: &WorkflowRecord) -> String {
    record
        .awaiting_gate()
        .and_then(|gate| {
            registry
                .get(record.record_type)
                .ok()
                .and_then(|def| def.stage_label(gate))
                .map(String::from)
        })
        .unwrap_or_else(|| record.state.to_string())
}

pub fn summarize(
    registry: &DefinitionRegistry,
    record_type: Option<RecordType>,
    records: &[WorkflowRecord],
) -> RecordSummary {
    let mut summary = RecordSummary {
        record_type,
        ..Default::default()
    };

    for record in records {
        summary.total += 1;
        *summary.by_state.entry(record.state).or_insert(0) += 1;

        let amount = record.attributes.monetary_amount().unwrap_or(0);
        if record.state == RecordState::Pending {
            summary.pending_amount = summary.pending_amount.saturating_add(amount);
            *summary
                .by_stage
                .entry(stage_label(registry, record))
                .or_insert(0) += 1;
        } else if record.state.is_success_terminal() {
            summary.settled_amount = summary.settled_amount.saturating_add(amount);
        }
    }

    summary
}
