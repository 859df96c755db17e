//! Crossbar Server — multi-region payment authorization router: legacy TCP
//! ingress, BIN routing with circuit-broken failover, a durable transaction
//! workflow, and an asynchronous audit trail.

pub mod admin;
pub mod audit;
pub mod chaos;
pub mod config;
pub mod dispatch;
pub mod network;
pub mod processor;
pub mod router;
pub mod routing;
pub mod screen;
pub mod storage;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testsupport;

pub use config::AppConfig;
pub use dispatch::{DispatchError, Dispatcher};
pub use network::{IsoServer, MessageHandler, NetworkConfig, ShutdownController};
pub use router::AuthRouter;
pub use routing::{BreakerConfig, HealthProbe, HealthRegistry, RouteTable};
pub use storage::{AuthStore, MemoryStore, NullStore};
pub use workflow::{Activities, PaymentWorkflow, WorkflowConfig};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
