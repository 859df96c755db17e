//! Per-region circuit breakers behind a process-wide registry.
//!
//! Each region carries a three-state breaker: `Closed` (traffic flows),
//! `Open` (region is shunned), `HalfOpen` (probing whether the region has
//! recovered). Transitions:
//!
//! - `Closed` + failure, once consecutive failures reach the threshold → `Open`
//! - `Open` + `is_healthy` call after the reset timeout → `HalfOpen`
//! - `HalfOpen` + success → `Closed`; `HalfOpen` + failure → `Open`
//!
//! A bounded history of recent error timestamps (pruned to the error window)
//! feeds the exported health gauge; the state machine itself only looks at
//! consecutive failures.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde::Serialize;

/// Circuit breaker tuning, shared by every region.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures required to trip the breaker.
    pub failure_threshold: u32,
    /// Time a tripped breaker stays open before a trial request is allowed.
    pub reset_timeout: Duration,
    /// Rolling window over which recent errors are retained for the gauge.
    pub error_window: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            error_window: Duration::from_secs(60),
        }
    }
}

/// Breaker state of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Healthy: requests flow normally.
    Closed,
    /// Tripped: requests should fail over.
    Open,
    /// Trial: one success closes the circuit, one failure re-opens it.
    HalfOpen,
}

/// Mutable health state of one region.
#[derive(Debug)]
struct RegionHealth {
    state: CircuitState,
    consecutive_failures: u32,
    recent_errors: VecDeque<Instant>,
    last_state_change: Instant,
}

impl RegionHealth {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            recent_errors: VecDeque::new(),
            last_state_change: Instant::now(),
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.state == CircuitState::HalfOpen {
            self.state = CircuitState::Closed;
            self.last_state_change = Instant::now();
        }
    }

    fn record_failure(&mut self, config: &BreakerConfig) {
        self.consecutive_failures += 1;

        let now = Instant::now();
        self.recent_errors.push_back(now);
        while let Some(front) = self.recent_errors.front() {
            if now.duration_since(*front) > config.error_window {
                self.recent_errors.pop_front();
            } else {
                break;
            }
        }

        match self.state {
            CircuitState::Closed if self.consecutive_failures >= config.failure_threshold => {
                self.state = CircuitState::Open;
                self.last_state_change = now;
            }
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.last_state_change = now;
            }
            _ => {}
        }
    }

    fn windowed_errors(&self, config: &BreakerConfig) -> usize {
        let now = Instant::now();
        self.recent_errors
            .iter()
            .filter(|t| now.duration_since(**t) <= config.error_window)
            .count()
    }

    /// Health gauge in `[0.0, 1.0]`: `0.0` while open, otherwise degraded
    /// linearly by windowed errors (ten errors saturate to `0.0`).
    fn gauge(&self, config: &BreakerConfig) -> f64 {
        if self.state == CircuitState::Open {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.windowed_errors(config) as f64 / 10.0;
        (1.0 - ratio).max(0.0)
    }
}

/// Read-only view of one region's health, exported to the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct RegionSnapshot {
    pub region: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub windowed_errors: usize,
    pub gauge: f64,
}

/// Process-wide registry of region breakers.
///
/// Built once at startup with the configured region set and passed explicitly
/// to the dispatcher, the workflow activities, the probe, and the admin
/// surface. Each region is guarded by its own readers-writer lock;
/// `record_success`/`record_failure` take the write path, gauge export the
/// read path, and `is_healthy` takes an upgradable read so it can perform the
/// `Open → HalfOpen` transition in place.
#[derive(Debug)]
pub struct HealthRegistry {
    regions: HashMap<String, RwLock<RegionHealth>>,
    config: BreakerConfig,
}

impl HealthRegistry {
    /// Creates a registry with one closed breaker per region name.
    #[must_use]
    pub fn new<I, S>(regions: I, config: BreakerConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            regions: regions
                .into_iter()
                .map(|r| (r.into(), RwLock::new(RegionHealth::new())))
                .collect(),
            config,
        }
    }

    /// Region names known to the registry.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    /// Records a successful call to `region`. Unknown regions are ignored.
    pub fn record_success(&self, region: &str) {
        if let Some(lock) = self.regions.get(region) {
            lock.write().record_success();
        }
    }

    /// Records a failed call to `region`. Unknown regions are ignored.
    pub fn record_failure(&self, region: &str) {
        if let Some(lock) = self.regions.get(region) {
            let mut health = lock.write();
            let before = health.state;
            health.record_failure(&self.config);
            if health.state != before {
                tracing::warn!(
                    region,
                    from = ?before,
                    to = ?health.state,
                    consecutive_failures = health.consecutive_failures,
                    "circuit state changed"
                );
            }
        }
    }

    /// Whether `region` should receive traffic.
    ///
    /// Returns true for `Closed` and `HalfOpen`. An `Open` breaker whose
    /// reset timeout has elapsed transitions to `HalfOpen` here and becomes
    /// eligible for one trial request. Unknown regions are unhealthy.
    pub fn is_healthy(&self, region: &str) -> bool {
        let Some(lock) = self.regions.get(region) else {
            return false;
        };

        let health = lock.upgradable_read();
        if health.state == CircuitState::Open {
            if health.last_state_change.elapsed() > self.config.reset_timeout {
                let mut health = RwLockUpgradableReadGuard::upgrade(health);
                health.state = CircuitState::HalfOpen;
                health.last_state_change = Instant::now();
                tracing::info!(region, "circuit half-open, allowing trial traffic");
                return true;
            }
            return false;
        }
        true
    }

    /// Current breaker state of `region`, if known.
    #[must_use]
    pub fn state(&self, region: &str) -> Option<CircuitState> {
        self.regions.get(region).map(|lock| lock.read().state)
    }

    /// Snapshot of every region for the admin surface, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RegionSnapshot> {
        let mut out: Vec<RegionSnapshot> = self
            .regions
            .iter()
            .map(|(region, lock)| {
                let health = lock.read();
                RegionSnapshot {
                    region: region.clone(),
                    state: health.state,
                    consecutive_failures: health.consecutive_failures,
                    windowed_errors: health.windowed_errors(&self.config),
                    gauge: health.gauge(&self.config),
                }
            })
            .collect();
        out.sort_by(|a, b| a.region.cmp(&b.region));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HealthRegistry {
        HealthRegistry::new(["us_east"], BreakerConfig::default())
    }

    fn fast_reset_registry() -> HealthRegistry {
        HealthRegistry::new(
            ["us_east"],
            BreakerConfig {
                reset_timeout: Duration::from_millis(20),
                ..BreakerConfig::default()
            },
        )
    }

    fn trip(registry: &HealthRegistry, region: &str) {
        for _ in 0..5 {
            registry.record_failure(region);
        }
    }

    #[test]
    fn new_regions_start_closed_and_healthy() {
        let reg = registry();
        assert_eq!(reg.state("us_east"), Some(CircuitState::Closed));
        assert!(reg.is_healthy("us_east"));
    }

    #[test]
    fn unknown_region_is_unhealthy() {
        let reg = registry();
        assert!(!reg.is_healthy("mars"));
        assert_eq!(reg.state("mars"), None);
    }

    #[test]
    fn threshold_failures_trip_the_breaker() {
        let reg = registry();
        for _ in 0..4 {
            reg.record_failure("us_east");
        }
        assert_eq!(reg.state("us_east"), Some(CircuitState::Closed));

        reg.record_failure("us_east");
        assert_eq!(reg.state("us_east"), Some(CircuitState::Open));
        assert!(!reg.is_healthy("us_east"));
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let reg = registry();
        for _ in 0..4 {
            reg.record_failure("us_east");
        }
        reg.record_success("us_east");
        // Four more failures do not reach the threshold again.
        for _ in 0..4 {
            reg.record_failure("us_east");
        }
        assert_eq!(reg.state("us_east"), Some(CircuitState::Closed));
    }

    #[test]
    fn record_success_is_idempotent_in_closed() {
        let reg = registry();
        for _ in 0..3 {
            reg.record_success("us_east");
        }
        let snap = &reg.snapshot()[0];
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[test]
    fn open_transitions_to_half_open_after_reset_timeout() {
        let reg = fast_reset_registry();
        trip(&reg, "us_east");
        assert!(!reg.is_healthy("us_east"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(reg.is_healthy("us_east"));
        assert_eq!(reg.state("us_east"), Some(CircuitState::HalfOpen));
    }

    #[test]
    fn half_open_success_closes_the_circuit() {
        let reg = fast_reset_registry();
        trip(&reg, "us_east");
        std::thread::sleep(Duration::from_millis(30));
        assert!(reg.is_healthy("us_east"));

        reg.record_success("us_east");
        let snap = &reg.snapshot()[0];
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.consecutive_failures, 0);
    }

    #[test]
    fn half_open_failure_reopens_the_circuit() {
        let reg = fast_reset_registry();
        trip(&reg, "us_east");
        std::thread::sleep(Duration::from_millis(30));
        assert!(reg.is_healthy("us_east"));

        reg.record_failure("us_east");
        assert_eq!(reg.state("us_east"), Some(CircuitState::Open));
        assert!(!reg.is_healthy("us_east"));
    }

    #[test]
    fn gauge_degrades_with_windowed_errors_and_zeroes_when_open() {
        let reg = registry();
        assert!((reg.snapshot()[0].gauge - 1.0).abs() < f64::EPSILON);

        reg.record_failure("us_east");
        reg.record_failure("us_east");
        let snap = &reg.snapshot()[0];
        assert_eq!(snap.windowed_errors, 2);
        assert!((snap.gauge - 0.8).abs() < 1e-9);

        trip(&reg, "us_east");
        assert!((reg.snapshot()[0].gauge - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snapshot_is_sorted_by_region() {
        let reg = HealthRegistry::new(["eu_west", "ap_south", "us_east"], BreakerConfig::default());
        let names: Vec<_> = reg.snapshot().into_iter().map(|s| s.region).collect();
        assert_eq!(names, ["ap_south", "eu_west", "us_east"]);
    }

    #[test]
    fn concurrent_updates_do_not_lose_the_trip() {
        let reg = std::sync::Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = std::sync::Arc::clone(&reg);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        reg.record_failure("us_east");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.state("us_east"), Some(CircuitState::Open));
    }
}
