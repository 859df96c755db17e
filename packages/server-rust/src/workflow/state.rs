//! Workflow state persistence: per-step outcomes and search attributes.
//!
//! Each step's outcome is recorded before the next step runs; re-executing a
//! workflow id replays recorded outcomes instead of re-running side effects.
//! Search attributes make in-flight and historical workflows queryable.

use std::collections::BTreeMap;

use async_trait::async_trait;
use crossbar_core::AuthResponse;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Step names of the payment workflow, in execution order.
pub mod step {
    pub const SCREEN: &str = "screen";
    pub const DISPATCH: &str = "dispatch";
    pub const AUDIT: &str = "audit";
}

/// The durable outcome of one workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    ScreenPassed { note: Option<String> },
    ScreenRejected { reason: String },
    /// The screen could not produce a verdict; the workflow proceeds
    /// fail-open with this recorded for the audit trail.
    ScreenErrored { error: String },
    Dispatched { response: AuthResponse },
    DispatchFailed { error: String },
    Audited,
    AuditFailed { error: String },
}

/// Persistence contract for workflow state.
///
/// Implementations must commit `record_step` before returning: a recorded
/// outcome is the replay boundary on resume.
#[async_trait]
pub trait WorkflowStateStore: Send + Sync {
    /// Records the outcome of `step` for `workflow_id` (insert-or-update).
    async fn record_step(
        &self,
        workflow_id: &str,
        step: &str,
        outcome: &StepOutcome,
    ) -> anyhow::Result<()>;

    /// The recorded outcome of `step`, if the step already completed.
    async fn step_outcome(
        &self,
        workflow_id: &str,
        step: &str,
    ) -> anyhow::Result<Option<StepOutcome>>;

    /// Merges search attributes into the workflow's attribute set.
    async fn upsert_attributes(
        &self,
        workflow_id: &str,
        attributes: &[(&str, String)],
    ) -> anyhow::Result<()>;

    /// The workflow's current search attributes.
    async fn attributes(&self, workflow_id: &str) -> anyhow::Result<BTreeMap<String, String>>;

    /// Workflow ids whose attribute `key` equals `value`.
    async fn find_by_attribute(&self, key: &str, value: &str) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Default, Clone)]
struct WorkflowRecord {
    steps: BTreeMap<String, StepOutcome>,
    attributes: BTreeMap<String, String>,
}

/// In-memory workflow state store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    workflows: DashMap<String, WorkflowRecord>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workflows with any recorded state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// True when no workflow state is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[async_trait]
impl WorkflowStateStore for MemoryStateStore {
    async fn record_step(
        &self,
        workflow_id: &str,
        step: &str,
        outcome: &StepOutcome,
    ) -> anyhow::Result<()> {
        self.workflows
            .entry(workflow_id.to_string())
            .or_default()
            .steps
            .insert(step.to_string(), outcome.clone());
        Ok(())
    }

    async fn step_outcome(
        &self,
        workflow_id: &str,
        step: &str,
    ) -> anyhow::Result<Option<StepOutcome>> {
        Ok(self
            .workflows
            .get(workflow_id)
            .and_then(|w| w.steps.get(step).cloned()))
    }

    async fn upsert_attributes(
        &self,
        workflow_id: &str,
        attributes: &[(&str, String)],
    ) -> anyhow::Result<()> {
        let mut record = self.workflows.entry(workflow_id.to_string()).or_default();
        for (key, value) in attributes {
            record
                .attributes
                .insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    async fn attributes(&self, workflow_id: &str) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(self
            .workflows
            .get(workflow_id)
            .map(|w| w.attributes.clone())
            .unwrap_or_default())
    }

    async fn find_by_attribute(&self, key: &str, value: &str) -> anyhow::Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .workflows
            .iter()
            .filter(|entry| entry.value().attributes.get(key).map(String::as_str) == Some(value))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
