//! The payment workflow: an ordered, replayable `screen → dispatch → audit`
//! sequence with per-step deadlines, retries, and persisted outcomes.
//!
//! Every path through the workflow terminates in an `AuthResponse`; failures
//! are encoded as response codes, never surfaced as errors to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crossbar_core::{codes, AuthRequest, AuthResponse};

use super::activities::Activities;
use super::retry::RetryPolicy;
use super::state::{step, StepOutcome, WorkflowStateStore};
use crate::screen::ScreenVerdict;

/// Deadlines and retry policy for the workflow steps.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub retry: RetryPolicy,
    pub screen_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub audit_timeout: Duration,
    /// Whole-workflow ceiling; exceeding it declines as system malfunction.
    pub execution_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            screen_timeout: Duration::from_secs(2),
            dispatch_timeout: Duration::from_secs(10),
            audit_timeout: Duration::from_secs(10),
            execution_timeout: Duration::from_secs(300),
        }
    }
}

/// One workflow engine shared by every connection task.
pub struct PaymentWorkflow {
    activities: Arc<Activities>,
    state: Arc<dyn WorkflowStateStore>,
    config: WorkflowConfig,
}

impl PaymentWorkflow {
    #[must_use]
    pub fn new(
        activities: Arc<Activities>,
        state: Arc<dyn WorkflowStateStore>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            activities,
            state,
            config,
        }
    }

    /// Executes (or resumes) the workflow for one authorization.
    ///
    /// Steps whose outcome is already recorded for `workflow_id` are
    /// replayed, not re-run, so a resumed workflow does not repeat side
    /// effects. Never fails: every exit is a well-formed response.
    pub async fn execute(&self, workflow_id: &str, request: AuthRequest) -> AuthResponse {
        match tokio::time::timeout(
            self.config.execution_timeout,
            self.run(workflow_id, request.clone()),
        )
        .await
        {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(workflow_id, stan = %request.stan, "workflow execution timed out");
                AuthResponse::declined(&request, codes::SYSTEM_MALFUNCTION)
            }
        }
    }

    async fn run(&self, id: &str, mut request: AuthRequest) -> AuthResponse {
        tracing::info!(
            workflow_id = id,
            stan = %request.stan,
            bin = request.bin().unwrap_or(""),
            "starting transaction workflow"
        );
        self.upsert(
            id,
            &[
                ("stan", request.stan.clone()),
                ("card_bin", request.bin().unwrap_or("").to_string()),
                ("amount", request.amount.clone()),
            ],
        )
        .await;

        // Resolve the primary region up front so synthetic declines carry a
        // region in their audit row even when dispatch never runs.
        let primary = self.activities.primary_region(&request.pan).to_string();
        request.region = Some(primary);

        // Step 1: screen.
        let mut tags = BTreeMap::new();
        match self.screen_step(id, &request).await {
            StepOutcome::ScreenRejected { reason } => {
                tracing::info!(workflow_id = id, stan = %request.stan, reason = %reason, "screen rejected transaction");
                self.upsert(id, &[("screen_status", "REJECTED".to_string())])
                    .await;

                let response = AuthResponse::declined(&request, codes::SUSPECTED_FRAUD);
                tags.insert("decline_reason".to_string(), "screen_reject".to_string());
                tags.insert("screen_reason".to_string(), reason);
                self.audit_step(id, &request, &response, true, tags).await;
                self.finish(id, &response).await;
                return response;
            }
            StepOutcome::ScreenErrored { error } => {
                // Fail-open: an unavailable screen must not block an
                // otherwise-valid authorization, but it must be auditable.
                tracing::warn!(workflow_id = id, stan = %request.stan, error = %error, "screen errored, proceeding");
                self.upsert(id, &[("screen_status", "ERROR".to_string())])
                    .await;
                tags.insert("screen_error".to_string(), error);
            }
            _ => {
                self.upsert(id, &[("screen_status", "PASSED".to_string())])
                    .await;
            }
        }

        // Step 2: dispatch.
        let (response, synthesized) = match self.dispatch_step(id, &mut request).await {
            StepOutcome::Dispatched { response } => (response, false),
            StepOutcome::DispatchFailed { error } => {
                tracing::error!(workflow_id = id, stan = %request.stan, error = %error, "dispatch exhausted, declining");
                tags.insert("decline_type".to_string(), "technical_failure".to_string());
                tags.insert("error".to_string(), error);
                (
                    AuthResponse::declined(&request, codes::SYSTEM_MALFUNCTION),
                    true,
                )
            }
            other => {
                // A foreign outcome under the dispatch key means corrupted
                // state; decline safely rather than guess.
                tracing::error!(workflow_id = id, outcome = ?other, "unexpected dispatch outcome");
                (
                    AuthResponse::declined(&request, codes::SYSTEM_MALFUNCTION),
                    true,
                )
            }
        };

        // Step 3: audit.
        self.audit_step(id, &request, &response, synthesized, tags)
            .await;
        self.finish(id, &response).await;
        response
    }

    async fn screen_step(&self, id: &str, request: &AuthRequest) -> StepOutcome {
        if let Some(previous) = self.replay(id, step::SCREEN).await {
            return previous;
        }

        let policy = &self.config.retry;
        let mut attempt = 1u32;
        let outcome = loop {
            let result = tokio::time::timeout(
                self.config.screen_timeout,
                self.activities.screen(request),
            )
            .await;

            let error = match result {
                Ok(Ok(ScreenVerdict::Pass { note })) => break StepOutcome::ScreenPassed { note },
                Ok(Ok(ScreenVerdict::Reject { reason })) => {
                    break StepOutcome::ScreenRejected { reason }
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "screen deadline exceeded".to_string(),
            };

            if attempt >= policy.max_attempts {
                break StepOutcome::ScreenErrored { error };
            }
            tokio::time::sleep(policy.delay(attempt)).await;
            attempt += 1;
        };

        self.record(id, step::SCREEN, &outcome).await;
        outcome
    }

    async fn dispatch_step(&self, id: &str, request: &mut AuthRequest) -> StepOutcome {
        if let Some(previous) = self.replay(id, step::DISPATCH).await {
            return previous;
        }

        let policy = &self.config.retry;
        let mut attempt = 1u32;
        let outcome = loop {
            let result = tokio::time::timeout(
                self.config.dispatch_timeout,
                self.activities.dispatch(request),
            )
            .await;

            let error = match result {
                Ok(Ok(response)) => break StepOutcome::Dispatched { response },
                Ok(Err(e)) if !e.is_retryable() => {
                    break StepOutcome::DispatchFailed {
                        error: e.to_string(),
                    }
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "dispatch deadline exceeded".to_string(),
            };

            if attempt >= policy.max_attempts {
                break StepOutcome::DispatchFailed { error };
            }
            tracing::info!(workflow_id = id, stan = %request.stan, attempt, error = %error, "retrying dispatch");
            tokio::time::sleep(policy.delay(attempt)).await;
            attempt += 1;
        };

        self.record(id, step::DISPATCH, &outcome).await;
        outcome
    }

    async fn audit_step(
        &self,
        id: &str,
        request: &AuthRequest,
        response: &AuthResponse,
        persist_record: bool,
        tags: BTreeMap<String, String>,
    ) {
        if self.replay(id, step::AUDIT).await.is_some() {
            return;
        }

        let result = tokio::time::timeout(
            self.config.audit_timeout,
            self.activities
                .audit(request, response, id, persist_record, tags),
        )
        .await;

        let outcome = match result {
            Ok(Ok(())) => StepOutcome::Audited,
            Ok(Err(e)) => {
                // Audit failure never changes the reply.
                tracing::warn!(workflow_id = id, stan = %request.stan, error = %e, "audit activity failed");
                StepOutcome::AuditFailed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(workflow_id = id, stan = %request.stan, "audit activity timed out");
                StepOutcome::AuditFailed {
                    error: "audit deadline exceeded".to_string(),
                }
            }
        };
        self.record(id, step::AUDIT, &outcome).await;
    }

    async fn finish(&self, id: &str, response: &AuthResponse) {
        let status = if response.approved() {
            "APPROVED"
        } else {
            "DECLINED"
        };
        self.upsert(
            id,
            &[
                ("response_code", response.response_code.clone()),
                ("transaction_status", status.to_string()),
            ],
        )
        .await;
        tracing::info!(
            workflow_id = id,
            stan = %response.stan,
            response_code = %response.response_code,
            "transaction workflow complete"
        );
    }

    async fn replay(&self, id: &str, step: &str) -> Option<StepOutcome> {
        match self.state.step_outcome(id, step).await {
            Ok(Some(outcome)) => {
                tracing::debug!(workflow_id = id, step, "replaying recorded step outcome");
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(workflow_id = id, step, error = %e, "state store read failed");
                None
            }
        }
    }

    async fn record(&self, id: &str, step: &str, outcome: &StepOutcome) {
        if let Err(e) = self.state.record_step(id, step, outcome).await {
            tracing::warn!(workflow_id = id, step, error = %e, "state store write failed");
        }
    }

    async fn upsert(&self, id: &str, attributes: &[(&str, String)]) {
        if let Err(e) = self.state.upsert_attributes(id, attributes).await {
            tracing::warn!(workflow_id = id, error = %e, "search attribute upsert failed");
        }
    }
}
