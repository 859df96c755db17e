//! Durable transaction workflow: ordered steps, per-step retry and
//! deadlines, persisted outcomes, and queryable search attributes.

pub mod activities;
pub mod engine;
pub mod retry;
pub mod state;

pub use activities::Activities;
pub use engine::{PaymentWorkflow, WorkflowConfig};
pub use retry::RetryPolicy;
pub use state::{step, MemoryStateStore, StepOutcome, WorkflowStateStore};
