//! `ClusterStateBundle` model, builder, and bucket-space derivation.

mod bundle;
mod deriver;
mod error;

pub use bundle::{BucketSpaceSimilarityPolicy, ClusterStateBundle, ClusterStateBundleBuilder};
pub use deriver::{DefaultSpaceDeriver, DerivationInputs, DeriverRegistry, GlobalSpaceDeriver, SpaceDeriver};
pub use error::BundleError;
