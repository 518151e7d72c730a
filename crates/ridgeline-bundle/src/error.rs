//! Bundle construction errors.

use ridgeline_types::BucketSpace;
use thiserror::Error;

/// Errors raised while building a [`crate::ClusterStateBundle`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// The builder was given both an explicit derived map and a
    /// `(bucket_spaces, deriver)` pair.
    #[error("bundle builder given both explicit derived states and a deriver configuration")]
    InvalidBuilderUsage,

    /// A bucket space named in the builder has no registered deriver.
    #[error("no deriver registered for bucket space {0:?}")]
    UnknownBucketSpace(BucketSpace),

    /// An explicitly supplied derived state's version disagrees with the
    /// baseline's.
    #[error(
        "derived state for bucket space {space:?} has version {found}, expected {expected}"
    )]
    DerivedVersionMismatch {
        space: BucketSpace,
        expected: u32,
        found: u32,
    },
}
