//! Generator errors.

use thiserror::Error;

/// Errors the generator can raise while building a candidate bundle.
///
/// A configuration error fails the tick and logs a warning; the last good
/// bundle remains in force. Callers should treat any variant here as
/// exactly that, not propagate it as a hard failure.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A bucket space named in [`crate::GeneratorConfig::bucket_spaces`] has
    /// no registered deriver.
    #[error(transparent)]
    Bundle(#[from] ridgeline_bundle::BundleError),
}
