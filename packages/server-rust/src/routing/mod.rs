//! Region routing: BIN route table, per-region circuit breakers, and the
//! periodic health probe.

pub mod health;
pub mod probe;
pub mod table;

pub use health::{BreakerConfig, CircuitState, HealthRegistry, RegionSnapshot};
pub use probe::HealthProbe;
pub use table::{RouteError, RouteTable};
