//! The `StateGenerator` merge policy: reported + wanted state,
//! timestamps, and configuration in; a `NoChange` decision or a candidate
//! `ClusterStateBundle` out.

mod config;
mod error;
mod generator;

pub use config::GeneratorConfig;
pub use error::GeneratorError;
pub use generator::{GenerationOutcome, StateGenerator};
