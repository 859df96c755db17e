//! The regional dispatcher: route selection, failover, bounded-deadline
//! processor calls, health bookkeeping, and the detached audit write.
//!
//! A regional timeout is absorbed here as a `91` decline so the caller still
//! receives a well-formed reply; every other processor failure surfaces as a
//! retryable error for the workflow.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbar_core::{codes, AuthRequest, AuthResponse};

use crate::chaos::ChaosEngine;
use crate::processor::{ProcessorError, ProcessorMap};
use crate::routing::{HealthRegistry, RouteTable};
use crate::storage::AuthStore;

/// Deadline for the detached audit write.
const AUDIT_DEADLINE: Duration = Duration::from_secs(5);

/// Fallback processor deadline for regions without a configured timeout.
const DEFAULT_REGION_TIMEOUT: Duration = Duration::from_secs(5);

/// Dispatch failures surfaced to the workflow.
///
/// Timeouts never appear here: the dispatcher converts them into a `91`
/// decline response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No processor is configured for the chosen region. A configuration
    /// fault; retrying cannot help.
    #[error("no processor configured for region {region}")]
    NoClient { region: String },

    /// The regional processor failed; retryable under the workflow policy.
    #[error("processor error in region {region}: {source}")]
    Processor {
        region: String,
        #[source]
        source: ProcessorError,
    },

    /// An injected chaos fault; retryable like a processor error.
    #[error("chaos fault: {0}")]
    Chaos(String),
}

impl DispatchError {
    /// Whether the workflow retry policy applies.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NoClient { .. })
    }
}

/// Routes one request to a healthy regional processor.
pub struct Dispatcher {
    table: RouteTable,
    health: Arc<HealthRegistry>,
    processors: ProcessorMap,
    region_timeouts: HashMap<String, Duration>,
    failover: HashMap<String, String>,
    store: Arc<dyn AuthStore>,
    chaos: Option<Arc<ChaosEngine>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        table: RouteTable,
        health: Arc<HealthRegistry>,
        processors: ProcessorMap,
        region_timeouts: HashMap<String, Duration>,
        failover: HashMap<String, String>,
        store: Arc<dyn AuthStore>,
        chaos: Option<Arc<ChaosEngine>>,
    ) -> Self {
        Self {
            table,
            health,
            processors,
            region_timeouts,
            failover,
            store,
            chaos,
        }
    }

    /// The primary region the route table selects for a PAN.
    #[must_use]
    pub fn route_region(&self, pan: &str) -> &str {
        self.table.route(pan)
    }

    /// Picks the region to dispatch to: the primary when healthy, otherwise
    /// a healthy configured failover, otherwise the primary regardless.
    fn select_region<'a>(&'a self, primary: &'a str, stan: &str) -> &'a str {
        if self.health.is_healthy(primary) {
            return primary;
        }

        match self.failover.get(primary) {
            Some(failover) if self.health.is_healthy(failover) => {
                tracing::info!(stan, primary, failover = %failover, "failing over");
                failover
            }
            Some(failover) => {
                tracing::warn!(
                    stan,
                    primary,
                    failover = %failover,
                    "primary and failover both unhealthy, keeping primary"
                );
                primary
            }
            None => {
                tracing::warn!(stan, primary, "primary unhealthy, no failover configured");
                primary
            }
        }
    }

    /// Dispatches one request.
    ///
    /// On success and on the absorbed timeout path the served region is
    /// recorded in `request.region` and an audit write is spawned on a
    /// detached task so persistence latency never delays the reply.
    ///
    /// # Errors
    ///
    /// `DispatchError::NoClient` when the chosen region has no processor;
    /// `DispatchError::Processor`/`Chaos` for retryable failures.
    pub async fn dispatch(
        &self,
        request: &mut AuthRequest,
    ) -> Result<AuthResponse, DispatchError> {
        if let Some(chaos) = &self.chaos {
            chaos
                .maybe_inject()
                .await
                .map_err(|f| DispatchError::Chaos(f.to_string()))?;
        }

        let primary = self.table.route(&request.pan).to_string();
        request.region = Some(primary.clone());

        let target = self.select_region(&primary, &request.stan).to_string();
        request.region = Some(target.clone());
        tracing::info!(stan = %request.stan, region = %target, "routing transaction");

        let processor = self
            .processors
            .get(&target)
            .ok_or_else(|| DispatchError::NoClient {
                region: target.clone(),
            })?;

        let deadline = self
            .region_timeouts
            .get(&target)
            .copied()
            .unwrap_or(DEFAULT_REGION_TIMEOUT);

        let start = Instant::now();
        match tokio::time::timeout(deadline, processor.process_auth(request)).await {
            Ok(Ok(mut response)) => {
                self.health.record_success(&target);
                #[allow(clippy::cast_possible_truncation)]
                let elapsed_ms = start.elapsed().as_millis() as u64;
                response.processing_time_ms = elapsed_ms;
                self.spawn_audit(request, &target, response.approved());
                Ok(response)
            }
            Err(_elapsed) => {
                // The region missed its deadline: decline rather than error
                // so the far end still receives a valid reply.
                self.health.record_failure(&target);
                tracing::warn!(
                    stan = %request.stan,
                    region = %target,
                    deadline_ms = deadline.as_millis() as u64,
                    "regional deadline exceeded, declining as switch inoperative"
                );
                self.spawn_audit(request, &target, false);
                Ok(AuthResponse::declined(request, codes::SWITCH_INOPERATIVE))
            }
            Ok(Err(source)) => {
                self.health.record_failure(&target);
                Err(DispatchError::Processor {
                    region: target,
                    source,
                })
            }
        }
    }

    /// Persists the audit record on a detached task with its own deadline.
    fn spawn_audit(&self, request: &AuthRequest, region: &str, approved: bool) {
        let store = Arc::clone(&self.store);
        let request = request.clone();
        let region = region.to_string();

        tokio::spawn(async move {
            let result = tokio::time::timeout(
                AUDIT_DEADLINE,
                store.save_authorization(&request, &region, approved),
            )
            .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(stan = %request.stan, error = %e, "audit write failed");
                }
                Err(_) => {
                    tracing::warn!(stan = %request.stan, "audit write timed out");
                }
            }
        });
    }
}
