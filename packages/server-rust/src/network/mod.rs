//! Legacy-link networking: configuration, connection tracking, the TCP
//! server, and shutdown control.

pub mod config;
pub mod connection;
pub mod server;
pub mod shutdown;

pub use config::{AdminConfig, NetworkConfig};
pub use connection::{ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use server::{IsoServer, MessageHandler};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
