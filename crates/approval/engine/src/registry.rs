//! Definition registry: one workflow definition per record type.
//!
//! Registering a definition for a type that already has one replaces it.
//! Records keep the gate list frozen at their submission, so replacing a
//! definition never reroutes in-flight records.

use crate::config::RoutingThresholds;
use crate::{definitions, routing};
use approval_types::{
    ApprovalError, ApprovalResult, GateName, RecordAttributes, RecordType, WorkflowDefinition,
};
use std::collections::HashMap;

/// Registry of workflow definitions
#[derive(Clone, Debug)]
pub struct DefinitionRegistry {
    definitions: HashMap<RecordType, WorkflowDefinition>,
}

impl DefinitionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in definitions
    pub fn with_builtin(thresholds: &RoutingThresholds) -> ApprovalResult<Self> {
        let mut registry = Self::new();
        for definition in definitions::builtin(thresholds) {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Register a workflow definition
    ///
    /// Validates the definition before storing.
    pub fn register(&mut self, definition: WorkflowDefinition) -> ApprovalResult<RecordType> {
        definition.validate()?;

        let record_type = definition.record_type;
        if self.definitions.insert(record_type, definition).is_some() {
            tracing::info!(record_type = %record_type, "Workflow definition replaced");
        } else {
            tracing::info!(record_type = %record_type, "Workflow definition registered");
        }
        Ok(record_type)
    }

    /// Get the definition for a record type
    pub fn get(&self, record_type: RecordType) -> ApprovalResult<&WorkflowDefinition> {
        self.definitions
            .get(&record_type)
            .ok_or_else(|| ApprovalError::UnknownRecordType(record_type.to_string()))
    }

    /// Resolve the gate list a record of this type and these attributes must pass
    pub fn resolve_gates(
        &self,
        record_type: RecordType,
        attributes: &RecordAttributes,
    ) -> ApprovalResult<Vec<GateName>> {
        routing::resolve_gates(self.get(record_type)?, attributes)
    }

    /// List all registered definitions, ordered by record type
    pub fn list(&self) -> Vec<&WorkflowDefinition> {
        let mut defs: Vec<_> = self.definitions.values().collect();
        defs.sort_by_key(|d| d.record_type);
        defs
    }

    pub fn count(&self) -> usize {
        self.definitions.len()
    }

    pub fn contains(&self, record_type: RecordType) -> bool {
        self.definitions.contains_key(&record_type)
    }

    pub fn remove(&mut self, record_type: RecordType) -> ApprovalResult<WorkflowDefinition> {
        let def = self
            .definitions
            .remove(&record_type)
            .ok_or_else(|| ApprovalError::UnknownRecordType(record_type.to_string()))?;

        tracing::info!(record_type = %record_type, "Workflow definition removed");
        Ok(def)
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
