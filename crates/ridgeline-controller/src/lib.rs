//! The cluster controller core: leader election, the per-tick
//! generate/bump/publish/activate cycle, and their supporting
//! configuration and error types.

mod activation;
mod config;
mod controller;
mod election;
mod error;
mod queue;
mod state_machine;

pub use activation::{ActivationCoordinator, ActivationOutcome, ActivationQuorumKind};
pub use config::ControllerConfig;
pub use controller::{FleetController, ReconfigureOutcome};
pub use election::{elect_winner, run_election, Role};
pub use error::ControllerError;
pub use queue::{BoundedQueue, IngestionQueues, PushResult};
pub use state_machine::{transition, Event, Phase};
