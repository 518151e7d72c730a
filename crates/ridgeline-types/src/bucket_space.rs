//! Bucket-space identifiers.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical partition of the data domain over which node state may be
/// transformed, e.g. `"default"` or `"global"`.
///
/// Kept as a thin wrapper over `String` rather than a closed enum: the core
/// only hard-codes the canonical `"default"`/`"global"` spaces,
/// but operators may configure additional spaces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketSpace(String);

impl BucketSpace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The `"default"` space: merges pending against `"global"` downgrade a
    /// node here.
    pub fn default_space() -> Self {
        Self::new("default")
    }

    /// The `"global"` space: identical to the baseline.
    pub fn global_space() -> Self {
        Self::new("global")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BucketSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BucketSpace {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for BucketSpace {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BucketSpace {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
