//! Periodic region health probe.
//!
//! A single background task ticks on a fixed interval and launches one
//! concurrent probe per region: a network-management request (`0800`) under
//! a bounded deadline. Outcomes feed the circuit breakers. Probes bypass the
//! workflow and never create audit records.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbar_core::AuthRequest;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::HealthRegistry;
use crate::processor::ProcessorMap;

/// Deadline for a single probe request.
const PROBE_DEADLINE: Duration = Duration::from_secs(5);

/// Background prober for every configured region.
pub struct HealthProbe {
    processors: ProcessorMap,
    health: Arc<HealthRegistry>,
    interval: Duration,
    sequence: AtomicU64,
}

impl HealthProbe {
    #[must_use]
    pub fn new(processors: ProcessorMap, health: Arc<HealthRegistry>, interval: Duration) -> Self {
        Self {
            processors,
            health,
            interval,
            sequence: AtomicU64::new(1),
        }
    }

    /// Spawns the probe loop. The task exits when `shutdown` observes a
    /// change (or its sender is dropped).
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick fires immediately; skip it so startup is quiet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.probe_all(),
                    _ = shutdown.changed() => {
                        tracing::debug!("health probe stopping");
                        return;
                    }
                }
            }
        })
    }

    /// Launches one concurrent probe per region.
    fn probe_all(&self) {
        for (region, processor) in &self.processors {
            let region = region.clone();
            let processor = Arc::clone(processor);
            let health = Arc::clone(&self.health);
            let request = self.probe_request(&region);

            tokio::spawn(async move {
                match tokio::time::timeout(PROBE_DEADLINE, processor.process_auth(&request)).await
                {
                    Ok(Ok(response)) => {
                        health.record_success(&region);
                        tracing::debug!(
                            region = %region,
                            response_code = %response.response_code,
                            "health probe ok"
                        );
                    }
                    Ok(Err(e)) => {
                        health.record_failure(&region);
                        tracing::warn!(region = %region, error = %e, "health probe failed");
                    }
                    Err(_) => {
                        health.record_failure(&region);
                        tracing::warn!(region = %region, "health probe timed out");
                    }
                }
            });
        }
    }

    /// A minimal network-management request for `region`.
    fn probe_request(&self, region: &str) -> AuthRequest {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        AuthRequest {
            mti: "0800".to_string(),
            pan: String::new(),
            amount: String::new(),
            transmission_time: String::new(),
            stan: format!("{:06}", seq % 1_000_000),
            region: Some(region.to_string()),
        }
    }
}
