//! Scenario files: treasury accounts plus an ordered list of engine
//! operations, executed against a fresh in-memory engine.

use approval_engine::{
    Account, Actor, ApprovalEngine, RecordFilter, TreasuryLedger, TreasurySummary,
};
use approval_types::{
    ActorId, ApprovalResult, Decision, RecordAttributes, RecordId, RequestToken, WorkflowRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub accounts: Vec<Account>,
    pub steps: Vec<Step>,
}

/// One engine operation. `record` names either an alias given at submission
/// or a literal record id.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Submit {
        #[serde(default)]
        alias: Option<String>,
        submitted_by: ActorId,
        attributes: RecordAttributes,
    },
    Act {
        record: String,
        actor: String,
        role: String,
        decision: Decision,
        #[serde(default)]
        comment: Option<String>,
        #[serde(default)]
        token: Option<RequestToken>,
    },
    Cancel {
        record: String,
        actor: ActorId,
        #[serde(default)]
        token: Option<RequestToken>,
    },
    Adjust {
        record: String,
        actor: ActorId,
        delta: i64,
        reason: String,
        #[serde(default)]
        token: Option<RequestToken>,
    },
}

impl Step {
    fn op(&self) -> &'static str {
        match self {
            Step::Submit { .. } => "submit",
            Step::Act { .. } => "act",
            Step::Cancel { .. } => "cancel",
            Step::Adjust { .. } => "adjust",
        }
    }
}

/// Result of a single step. Refused operations are reported, not fatal.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    pub stage: String,
    #[serde(flatten)]
    pub record: WorkflowRecord,
}

/// Everything `approvalctl run` prints
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub outcomes: Vec<StepOutcome>,
    pub records: Vec<RecordView>,
    pub treasury: TreasurySummary,
}

pub async fn run(
    engine: &ApprovalEngine,
    ledger: &TreasuryLedger,
    steps: Vec<Step>,
) -> ApprovalResult<Report> {
    let mut aliases: HashMap<String, RecordId> = HashMap::new();
    let mut outcomes = Vec::with_capacity(steps.len());

    for (index, step) in steps.into_iter().enumerate() {
        let op = step.op();
        let result = match step {
            Step::Submit {
                alias,
                submitted_by,
                attributes,
            } => {
                let result = engine.submit(&submitted_by, attributes).await;
                if let (Some(alias), Ok(record)) = (alias, &result) {
                    aliases.insert(alias, record.id.clone());
                }
                result
            }
            Step::Act {
                record,
                actor,
                role,
                decision,
                comment,
                token,
            } => {
                let id = lookup(&aliases, &record);
                engine
                    .act(&id, &Actor::new(actor, role), decision, comment, token)
                    .await
            }
            Step::Cancel {
                record,
                actor,
                token,
            } => engine.cancel(&lookup(&aliases, &record), &actor, token).await,
            Step::Adjust {
                record,
                actor,
                delta,
                reason,
                token,
            } => {
                engine
                    .adjust(&lookup(&aliases, &record), &actor, delta, &reason, token)
                    .await
            }
        };

        let outcome = match result {
            Ok(record) => StepOutcome {
                step: index,
                op,
                stage: Some(engine.stage_label(&record)),
                record: Some(record.id),
                error: None,
            },
            Err(err) => {
                tracing::warn!(step = index, op, error = %err, "Scenario step refused");
                StepOutcome {
                    step: index,
                    op,
                    record: None,
                    stage: None,
                    error: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    let records = engine
        .list(&RecordFilter::all())
        .await?
        .into_iter()
        .map(|record| RecordView {
            stage: engine.stage_label(&record),
            record,
        })
        .collect();

    Ok(Report {
        outcomes,
        records,
        treasury: ledger.summary().await,
    })
}

fn lookup(aliases: &HashMap<String, RecordId>, name: &str) -> RecordId {
    aliases
        .get(name)
        .cloned()
        .unwrap_or_else(|| RecordId::new(name))
}
