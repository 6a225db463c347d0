//! Approval Engine: the generic state machine every record type runs on.
//!
//! The engine:
//! 1. Resolves and freezes a record's gates at submission
//! 2. Validates and applies gate decisions, cancellations and adjustments
//! 3. Appends one audit entry per accepted operation
//! 4. Applies the bound side effect exactly once, on the transition into
//!    the success state
//!
//! Every mutating operation on a record runs under that record's lock, and
//! the store update carries the version the operation started from. A failed
//! operation leaves the stored record and all balances untouched.

use crate::config::EngineConfig;
use crate::ledger::{Direction, LedgerAdapter, TreasuryLedger};
use crate::registry::DefinitionRegistry;
use crate::replay::{replay, ReplayedState};
use crate::store::{InMemoryRecordStore, RecordFilter, RecordStore};
use crate::summary::{self, RecordSummary};
use approval_types::*;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// An actor together with the role they act in
///
/// The role is asserted by the caller's authorization layer; the engine only
/// checks it against the gate the record is waiting at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub role: GateName,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(id),
            role: GateName::new(role),
        }
    }
}

/// The approval engine
pub struct ApprovalEngine {
    registry: Arc<DefinitionRegistry>,
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn LedgerAdapter>,
    locks: DashMap<RecordId, Arc<Mutex<()>>>,
}

impl ApprovalEngine {
    pub fn new(
        registry: DefinitionRegistry,
        store: Arc<dyn RecordStore>,
        ledger: Arc<dyn LedgerAdapter>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            ledger,
            locks: DashMap::new(),
        }
    }

    /// Built-in definitions over an in-memory store and the given treasury
    pub fn with_treasury(config: &EngineConfig, ledger: Arc<TreasuryLedger>) -> ApprovalResult<Self> {
        let registry = DefinitionRegistry::with_builtin(&config.routing)?;
        Ok(Self::new(
            registry,
            Arc::new(InMemoryRecordStore::new()),
            ledger,
        ))
    }

    // ── Definitions ──────────────────────────────────────────────────

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    /// Gates a record with these attributes would have to pass
    pub fn resolve_gates(
        &self,
        record_type: RecordType,
        attributes: &RecordAttributes,
    ) -> ApprovalResult<Vec<GateName>> {
        self.registry.resolve_gates(record_type, attributes)
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Submit a new record.
    ///
    /// Records whose gate list resolves empty are settled immediately.
    pub async fn submit(
        &self,
        submitter: &ActorId,
        attributes: RecordAttributes,
    ) -> ApprovalResult<WorkflowRecord> {
        let record_type = attributes.record_type();
        let definition = self.registry.get(record_type)?;

        attributes.validate()?;
        self.ledger.validate(&attributes).await?;
        let gates = self.registry.resolve_gates(record_type, &attributes)?;

        let id = self.store.reserve_id(record_type).await?;
        let mut record = WorkflowRecord::new(id, attributes, gates, submitter.clone());

        let effect_applied = if record.resolved_gates.is_empty() {
            self.settle(&mut record, definition).await?
        } else {
            false
        };

        if let Err(err) = self.store.insert(record.clone()).await {
            if effect_applied {
                self.compensate(&record, definition).await;
            }
            return Err(err.into());
        }

        tracing::info!(
            record_id = %record.id,
            record_type = %record_type,
            submitted_by = %submitter,
            gates = record.resolved_gates.len(),
            state = %record.state,
            "Record submitted"
        );
        Ok(record)
    }

    // ── Decisions ────────────────────────────────────────────────────

    /// Approve or reject at the record's current gate.
    ///
    /// Retrying with the same request token and decision returns the record
    /// without acting again.
    pub async fn act(
        &self,
        record_id: &RecordId,
        actor: &Actor,
        decision: Decision,
        comment: Option<String>,
        request_token: Option<RequestToken>,
    ) -> ApprovalResult<WorkflowRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;

        if is_replayed(&record, request_token.as_ref(), &decision.into())? {
            tracing::debug!(record_id = %record_id, "Replayed decision ignored");
            return Ok(record);
        }
        if record.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(record_id.clone()));
        }

        let definition = self.registry.get(record.record_type)?;
        let expected = record.awaiting_gate().cloned().ok_or_else(|| {
            ApprovalError::AuditIntegrity(format!("{} is pending without a gate", record_id))
        })?;
        if expected != actor.role {
            tracing::warn!(
                record_id = %record_id,
                expected = %expected,
                actual = %actor.role,
                "Gate mismatch"
            );
            return Err(ApprovalError::gate_mismatch(&expected, &actor.role));
        }

        let comment = normalize(comment);
        if decision == Decision::Reject && comment.is_none() {
            return Err(ApprovalError::MissingReason(format!(
                "rejecting {} at gate '{}'",
                record_id, expected
            )));
        }

        let expected_version = record.version;
        record.audit_trail.append(
            record_id,
            AuditDraft::decision(
                expected.clone(),
                actor.id.clone(),
                decision,
                comment.clone(),
                request_token,
            ),
        );

        let mut effect_applied = false;
        match decision {
            Decision::Approve => {
                let passed_all = record.advance_gate()?;
                tracing::info!(
                    record_id = %record_id,
                    gate = %expected,
                    actor = %actor.id,
                    "Gate approved"
                );
                if passed_all {
                    effect_applied = self.settle(&mut record, definition).await?;
                }
            }
            Decision::Reject => {
                record.terminate(RecordState::Rejected, comment)?;
                tracing::info!(
                    record_id = %record_id,
                    gate = %expected,
                    actor = %actor.id,
                    "Record rejected"
                );
            }
        }

        self.persist(record, expected_version, definition, effect_applied)
            .await
    }

    /// Cancel a pending record nobody has acted on yet.
    pub async fn cancel(
        &self,
        record_id: &RecordId,
        actor_id: &ActorId,
        request_token: Option<RequestToken>,
    ) -> ApprovalResult<WorkflowRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;

        if is_replayed(&record, request_token.as_ref(), &AuditAction::Cancel)? {
            return Ok(record);
        }
        if record.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(record_id.clone()));
        }

        let definition = self.registry.get(record.record_type)?;
        if !definition.cancellable || !record.audit_trail.is_empty() {
            tracing::warn!(record_id = %record_id, actor = %actor_id, "Cancellation refused");
            return Err(ApprovalError::NotCancellable(record_id.clone()));
        }

        let expected_version = record.version;
        record
            .audit_trail
            .append(record_id, AuditDraft::cancel(actor_id.clone(), request_token));
        record.terminate(
            RecordState::Cancelled,
            Some(format!("cancelled by {}", actor_id)),
        )?;

        tracing::info!(record_id = %record_id, actor = %actor_id, "Record cancelled");
        self.persist(record, expected_version, definition, false)
            .await
    }

    /// Apply a numeric adjustment (bonus, deduction) to an in-flight record.
    ///
    /// Derived totals are recomputed; the frozen gate list is not.
    pub async fn adjust(
        &self,
        record_id: &RecordId,
        actor_id: &ActorId,
        delta: i64,
        reason: &str,
        request_token: Option<RequestToken>,
    ) -> ApprovalResult<WorkflowRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;

        if is_replayed(&record, request_token.as_ref(), &AuditAction::Adjust { delta })? {
            return Ok(record);
        }
        if record.is_terminal() {
            return Err(ApprovalError::AlreadyTerminal(record_id.clone()));
        }

        let definition = self.registry.get(record.record_type)?;
        if !definition.is_adjustable() {
            return Err(ApprovalError::NotAdjustable(record_id.clone()));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApprovalError::MissingReason(format!(
                "adjusting {}",
                record_id
            )));
        }

        match &mut record.attributes {
            RecordAttributes::Payroll(payroll) => {
                let mut adjusted = payroll.clone();
                adjusted.adjustments = payroll.adjustments.checked_add(delta).ok_or_else(|| {
                    ApprovalError::InvalidAttributes(format!(
                        "adjustment of {} to {} is out of range",
                        delta, record_id
                    ))
                })?;
                match adjusted.net_salary() {
                    Some(net) if net >= 0 => *payroll = adjusted,
                    Some(_) => {
                        return Err(ApprovalError::InvalidAttributes(format!(
                            "adjustment of {} would make the net salary of {} negative",
                            delta, record_id
                        )))
                    }
                    None => {
                        return Err(ApprovalError::InvalidAttributes(format!(
                            "adjustment of {} would put the net salary of {} out of range",
                            delta, record_id
                        )))
                    }
                }
            }
            _ => return Err(ApprovalError::NotAdjustable(record_id.clone())),
        }

        let expected_version = record.version;
        record.audit_trail.append(
            record_id,
            AuditDraft::adjust(actor_id.clone(), delta, reason, request_token),
        );

        tracing::info!(
            record_id = %record_id,
            actor = %actor_id,
            delta,
            magnitude = ?record.magnitude(),
            "Record adjusted"
        );
        self.persist(record, expected_version, definition, false)
            .await
    }

    // ── Metadata ─────────────────────────────────────────────────────

    /// Attach a document. Allowed in any state.
    pub async fn attach_document(
        &self,
        record_id: &RecordId,
        document: Document,
    ) -> ApprovalResult<WorkflowRecord> {
        if document.name.trim().is_empty() {
            return Err(ApprovalError::InvalidAttributes(
                "document name must not be empty".to_string(),
            ));
        }

        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;
        let definition = self.registry.get(record.record_type)?;

        let expected_version = record.version;
        tracing::debug!(record_id = %record_id, document = %document.name, "Document attached");
        record.documents.push(document);
        self.persist(record, expected_version, definition, false)
            .await
    }

    /// Record that an investment's memo was shared. Allowed in any state,
    /// but only once the investment carries a memo.
    pub async fn share_memo(
        &self,
        record_id: &RecordId,
        channel: ShareChannel,
        recipient: &str,
        shared_by: &ActorId,
    ) -> ApprovalResult<WorkflowRecord> {
        if recipient.trim().is_empty() {
            return Err(ApprovalError::InvalidAttributes(
                "memo recipient must not be empty".to_string(),
            ));
        }

        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;
        let definition = self.registry.get(record.record_type)?;

        match &record.attributes {
            RecordAttributes::Investment(investment) => {
                let has_memo = investment
                    .final_memo
                    .as_deref()
                    .map(|memo| !memo.trim().is_empty())
                    .unwrap_or(false);
                if !has_memo {
                    return Err(ApprovalError::InvalidAttributes(format!(
                        "{} has no memo to share",
                        record_id
                    )));
                }
            }
            other => {
                return Err(ApprovalError::InvalidAttributes(format!(
                    "memos are only shared for investments, not {}",
                    other.record_type()
                )))
            }
        }

        let expected_version = record.version;
        record.shares.push(MemoShare {
            channel,
            recipient: recipient.trim().to_string(),
            shared_by: shared_by.clone(),
            shared_at: Utc::now(),
        });

        tracing::info!(record_id = %record_id, channel = ?channel, "Memo shared");
        self.persist(record, expected_version, definition, false)
            .await
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn get(&self, record_id: &RecordId) -> ApprovalResult<WorkflowRecord> {
        self.load(record_id).await
    }

    /// The record's audit entries, oldest first
    pub async fn get_history(&self, record_id: &RecordId) -> ApprovalResult<Vec<AuditEntry>> {
        Ok(self.load(record_id).await?.history().to_vec())
    }

    pub async fn list(&self, filter: &RecordFilter) -> ApprovalResult<Vec<WorkflowRecord>> {
        Ok(self.store.list(filter).await?)
    }

    /// Counts per state and stage plus money totals, for one type or all
    pub async fn summary(&self, record_type: Option<RecordType>) -> ApprovalResult<RecordSummary> {
        let filter = RecordFilter {
            record_type,
            ..RecordFilter::default()
        };
        let records = self.store.list(&filter).await?;
        Ok(summary::summarize(&self.registry, record_type, &records))
    }

    /// Display label for where the record stands (`pending_review`, `paid`, ...)
    pub fn stage_label(&self, record: &WorkflowRecord) -> String {
        summary::stage_label(&self.registry, record)
    }

    // ── Recovery ─────────────────────────────────────────────────────

    /// Check a stored record's hash chain and that its state matches a replay
    /// of its audit trail.
    pub async fn verify(&self, record_id: &RecordId) -> ApprovalResult<()> {
        let record = self.load(record_id).await?;
        let replayed = self.replay_record(&record)?;
        if replayed.state != record.state
            || replayed.current_gate_index != record.current_gate_index
        {
            return Err(ApprovalError::AuditIntegrity(format!(
                "{} is {} at {:?} but its trail replays to {} at {:?}",
                record_id,
                record.state,
                record.current_gate_index,
                replayed.state,
                replayed.current_gate_index
            )));
        }
        Ok(())
    }

    /// Bring a record's state fields back in line with its audit trail.
    ///
    /// A settled trail whose side effect was never recorded gets the effect
    /// applied now.
    pub async fn recover(&self, record_id: &RecordId) -> ApprovalResult<WorkflowRecord> {
        let _guard = self.lock_record(record_id).await;
        let mut record = self.load(record_id).await?;
        let definition = self.registry.get(record.record_type)?;
        let replayed = self.replay_record(&record)?;

        let adjustments_drifted = match &record.attributes {
            RecordAttributes::Payroll(payroll) => payroll.adjustments != replayed.adjustment_total,
            _ => false,
        };
        if replayed.state == record.state
            && replayed.current_gate_index == record.current_gate_index
            && !adjustments_drifted
        {
            return Ok(record);
        }

        let expected_version = record.version;
        record.state = replayed.state;
        record.current_gate_index = replayed.current_gate_index;
        record.terminal_reason = match record.audit_trail.last() {
            Some(entry) if entry.action == AuditAction::Reject => entry.comment.clone(),
            Some(entry) if entry.action == AuditAction::Cancel => {
                Some(format!("cancelled by {}", entry.actor_id))
            }
            _ => None,
        };
        if let RecordAttributes::Payroll(payroll) = &mut record.attributes {
            payroll.adjustments = replayed.adjustment_total;
        }
        if record.state.is_terminal() && record.completed_at.is_none() {
            record.completed_at = Some(Utc::now());
        }

        let mut effect_applied = false;
        if record.state == definition.success_state
            && record.effect.is_none()
            && definition.effect != SideEffect::None
        {
            let receipt = self
                .ledger
                .apply_effect(
                    record_id,
                    definition.effect,
                    &record.attributes,
                    Direction::Apply,
                )
                .await?;
            record.effect = Some(receipt);
            effect_applied = true;
        }

        tracing::warn!(
            record_id = %record_id,
            state = %record.state,
            gate_index = ?record.current_gate_index,
            "Record recovered from audit trail"
        );
        self.persist(record, expected_version, definition, effect_applied)
            .await
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn lock_record(&self, record_id: &RecordId) -> RecordLock<'_> {
        let lock = self
            .locks
            .entry(record_id.clone())
            .or_default()
            .value()
            .clone();
        RecordLock {
            locks: &self.locks,
            record_id: record_id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn load(&self, record_id: &RecordId) -> ApprovalResult<WorkflowRecord> {
        self.store
            .get(record_id)
            .await?
            .ok_or_else(|| ApprovalError::RecordNotFound(record_id.clone()))
    }

    fn replay_record(&self, record: &WorkflowRecord) -> ApprovalResult<ReplayedState> {
        let definition = self.registry.get(record.record_type)?;
        let trail = AuditTrail::from_entries(&record.id, record.history().to_vec())?;
        replay(&record.id, definition, &record.resolved_gates, trail.entries())
    }

    /// Move a record into its success state and apply the bound side effect.
    /// Returns whether a ledger effect was applied.
    async fn settle(
        &self,
        record: &mut WorkflowRecord,
        definition: &WorkflowDefinition,
    ) -> ApprovalResult<bool> {
        record.terminate(definition.success_state, None)?;

        if definition.effect == SideEffect::None {
            tracing::info!(record_id = %record.id, state = %record.state, "Record settled");
            return Ok(false);
        }

        let receipt = self
            .ledger
            .apply_effect(
                &record.id,
                definition.effect,
                &record.attributes,
                Direction::Apply,
            )
            .await
            .inspect_err(|err| {
                tracing::warn!(record_id = %record.id, error = %err, "Side effect refused");
            })?;

        tracing::info!(
            record_id = %record.id,
            state = %record.state,
            reference = %receipt.reference,
            "Record settled"
        );
        record.effect = Some(receipt);
        Ok(true)
    }

    async fn persist(
        &self,
        mut record: WorkflowRecord,
        expected_version: u64,
        definition: &WorkflowDefinition,
        effect_applied: bool,
    ) -> ApprovalResult<WorkflowRecord> {
        record.touch();
        match self.store.update(record.clone(), expected_version).await {
            Ok(()) => Ok(record),
            Err(err) => {
                tracing::error!(record_id = %record.id, error = %err, "Record update failed");
                if effect_applied {
                    self.compensate(&record, definition).await;
                }
                Err(err.into())
            }
        }
    }

    async fn compensate(&self, record: &WorkflowRecord, definition: &WorkflowDefinition) {
        if let Err(err) = self
            .ledger
            .apply_effect(
                &record.id,
                definition.effect,
                &record.attributes,
                Direction::Reverse,
            )
            .await
        {
            tracing::error!(
                record_id = %record.id,
                error = %err,
                "Side effect could not be reversed"
            );
        }
    }
}

/// Held for the duration of a mutating operation. On release the record's
/// mutex leaves the lock map unless another operation is queued on it.
struct RecordLock<'a> {
    locks: &'a DashMap<RecordId, Arc<Mutex<()>>>,
    record_id: RecordId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RecordLock<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder
        self.guard.take();
        self.locks
            .remove_if(&self.record_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Whether `token` already produced `action` on this record. A token reused
/// for a different action is a `DuplicateRequest`.
fn is_replayed(
    record: &WorkflowRecord,
    token: Option<&RequestToken>,
    action: &AuditAction,
) -> ApprovalResult<bool> {
    let Some(token) = token else {
        return Ok(false);
    };
    match record.audit_trail.find_by_token(token) {
        Some(entry) if &entry.action == action => Ok(true),
        Some(_) => Err(ApprovalError::DuplicateRequest(token.clone())),
        None => Ok(false),
    }
}

fn normalize(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::{Account, AccountType};
    use chrono::NaiveDate;

    fn make_engine() -> (ApprovalEngine, Arc<TreasuryLedger>) {
        let ledger = Arc::new(
            TreasuryLedger::with_accounts(
                &LedgerConfig::default(),
                [Account::new("ACC-OPS", AccountType::Operating, 500_000)],
            )
            .unwrap(),
        );
        let engine = ApprovalEngine::with_treasury(&EngineConfig::default(), ledger.clone()).unwrap();
        (engine, ledger)
    }

    fn make_payroll(basic: i64) -> RecordAttributes {
        RecordAttributes::Payroll(PayrollAttributes {
            employee_id: "EMP020".into(),
            employee_name: "Layla".into(),
            period: "2025-03".into(),
            basic_salary: basic,
            allowances: 1_500,
            overtime_pay: 0,
            deductions: 500,
            adjustments: 0,
        })
    }

    fn make_leave(days: u32) -> RecordAttributes {
        RecordAttributes::Leave(LeaveAttributes {
            employee_id: "EMP021".into(),
            employee_name: "Yusuf".into(),
            leave_type: LeaveType::Annual,
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, days).unwrap(),
            reason: "hajj".into(),
        })
    }

    #[tokio::test]
    async fn test_submit_creates_pending_record() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("EMP021"), make_leave(3))
            .await
            .unwrap();
        assert_eq!(record.id.as_str(), "LV-000001");
        assert_eq!(record.state, RecordState::Pending);
        assert_eq!(record.current_gate_index, Some(0));
        assert_eq!(record.resolved_gates, vec![GateName::from("supervisor")]);
        assert!(record.history().is_empty());
    }

    #[tokio::test]
    async fn test_long_leave_needs_hr() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("EMP021"), make_leave(10))
            .await
            .unwrap();
        assert_eq!(
            record.resolved_gates,
            vec![GateName::from("supervisor"), GateName::from("hr")]
        );
    }

    #[tokio::test]
    async fn test_adjust_recomputes_net_and_keeps_gates() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("hr-1"), make_payroll(10_000))
            .await
            .unwrap();
        let gates = record.resolved_gates.clone();

        let adjusted = engine
            .adjust(&record.id, &ActorId::new("hr-1"), 2_000, "performance bonus", None)
            .await
            .unwrap();
        assert_eq!(adjusted.magnitude(), Some(13_000));
        assert_eq!(adjusted.resolved_gates, gates);
        assert_eq!(
            adjusted.history()[0].action,
            AuditAction::Adjust { delta: 2_000 }
        );
        assert!(adjusted.history()[0].gate.is_none());
    }

    #[tokio::test]
    async fn test_adjust_rejects_negative_net_and_blank_reason() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("hr-1"), make_payroll(1_000))
            .await
            .unwrap();

        assert!(matches!(
            engine
                .adjust(&record.id, &ActorId::new("hr-1"), -5_000, "penalty", None)
                .await,
            Err(ApprovalError::InvalidAttributes(_))
        ));
        assert!(matches!(
            engine
                .adjust(&record.id, &ActorId::new("hr-1"), 100, "  ", None)
                .await,
            Err(ApprovalError::MissingReason(_))
        ));
        assert_eq!(engine.get(&record.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_adjust_not_supported_for_leave() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("EMP021"), make_leave(2))
            .await
            .unwrap();
        assert!(matches!(
            engine
                .adjust(&record.id, &ActorId::new("hr-1"), 1, "extra day", None)
                .await,
            Err(ApprovalError::NotAdjustable(_))
        ));
    }

    #[tokio::test]
    async fn test_payroll_reaches_paid_and_reports_stages() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("hr-1"), make_payroll(8_000))
            .await
            .unwrap();
        assert_eq!(engine.stage_label(&record), "pending");

        let record = engine
            .act(&record.id, &Actor::new("hr-1", "hr"), Decision::Approve, None, None)
            .await
            .unwrap();
        assert_eq!(engine.stage_label(&record), "processing");

        let record = engine
            .act(&record.id, &Actor::new("fin-1", "finance"), Decision::Approve, None, None)
            .await
            .unwrap();
        assert_eq!(record.state, RecordState::Paid);
        assert_eq!(engine.stage_label(&record), "paid");
        assert!(record.effect.is_none());
    }

    #[tokio::test]
    async fn test_record_not_found() {
        let (engine, _) = make_engine();
        let missing = RecordId::new("INV-999999");
        assert!(matches!(
            engine
                .act(&missing, &Actor::new("m", "manager"), Decision::Approve, None, None)
                .await,
            Err(ApprovalError::RecordNotFound(_))
        ));
        assert!(matches!(
            engine.get_history(&missing).await,
            Err(ApprovalError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_accepts_engine_written_records() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("EMP021"), make_leave(7))
            .await
            .unwrap();
        engine
            .act(&record.id, &Actor::new("s-1", "supervisor"), Decision::Approve, None, None)
            .await
            .unwrap();
        engine.verify(&record.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_records_leave_no_locks_behind() {
        let (engine, _) = make_engine();
        for i in 0..200 {
            let missing = RecordId::new(format!("INV-{:06}", 900_000 + i));
            assert!(engine
                .act(&missing, &Actor::new("m", "manager"), Decision::Approve, None, None)
                .await
                .is_err());
            assert!(engine.cancel(&missing, &ActorId::new("x"), None).await.is_err());
            assert!(engine
                .adjust(&missing, &ActorId::new("x"), 1, "bonus", None)
                .await
                .is_err());
        }
        assert_eq!(engine.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_lock_released_after_settlement() {
        let (engine, _) = make_engine();
        let record = engine
            .submit(&ActorId::new("EMP021"), make_leave(2))
            .await
            .unwrap();
        let record = engine
            .act(&record.id, &Actor::new("s-1", "supervisor"), Decision::Approve, None, None)
            .await
            .unwrap();
        assert!(record.is_terminal());
        assert!(engine.locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_queued_operations_keep_the_lock_until_done() {
        let (engine, _) = make_engine();
        let engine = Arc::new(engine);
        let record = engine
            .submit(&ActorId::new("hr-1"), make_payroll(10_000))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = engine.clone();
                let id = record.id.clone();
                tokio::spawn(async move {
                    engine
                        .adjust(&id, &ActorId::new("hr-1"), 10, &format!("shift {}", i), None)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = engine.get(&record.id).await.unwrap();
        assert_eq!(stored.history().len(), 16);
        assert_eq!(stored.magnitude(), Some(10_000 + 1_500 - 500 + 160));
        assert!(engine.locks.is_empty());
    }

    #[tokio::test]
    async fn test_payroll_overflow_refused_without_panicking() {
        let (engine, _) = make_engine();
        assert!(matches!(
            engine
                .submit(&ActorId::new("hr-1"), make_payroll(i64::MAX))
                .await,
            Err(ApprovalError::InvalidAttributes(_))
        ));

        let record = engine
            .submit(&ActorId::new("hr-1"), make_payroll(10_000))
            .await
            .unwrap();
        assert!(matches!(
            engine
                .adjust(&record.id, &ActorId::new("hr-1"), i64::MAX, "windfall", None)
                .await,
            Err(ApprovalError::InvalidAttributes(_))
        ));
        let stored = engine.get(&record.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert!(stored.history().is_empty());
        assert_eq!(stored.magnitude(), Some(11_000));
    }

    #[test]
    fn test_normalize_comment() {
        assert_eq!(normalize(Some("  ok ".into())), Some("ok".into()));
        assert_eq!(normalize(Some("   ".into())), None);
        assert_eq!(normalize(None), None);
    }
}
