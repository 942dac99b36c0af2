//! Reconciliation engine: the event-driven state machine deciding when a
//! database injection must occur and driving Fetch → Extract → Apply.
//!
//! Layout:
//! - `status.rs`: the published consolidated status
//! - `engine.rs`: pure decision logic and the run pipeline
//! - `actor.rs`: single-consumer actor (event queue, coalescing, timer)

mod actor;
mod engine;
mod status;

pub use actor::{ReconcilerArgs, ReconcilerHandle, ReconcilerMessage, spawn};
pub use engine::{Decision, RunContext, RunInputs, RunOutcome, Trigger, decide, execute_run};
pub use status::ReconcileStatus;
