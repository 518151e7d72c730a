//! Wire encoding of a [`ClusterStateBundle`].
//!
//! A compact self-describing payload: `version`, the baseline's canonical
//! text, a `space → text` map for derived states, an optional feed-block,
//! and the deferred-activation flag. This is the envelope
//! `setSystemState` sends over RPC and the controller persists at
//! `published_state_bundle`.

use std::collections::BTreeMap;

use ridgeline_bundle::{ClusterStateBundle, ClusterStateBundleBuilder};
use ridgeline_types::{codec, AnnotatedClusterState, BucketSpace, FeedBlock, GenerationReason};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field-wise mirror of [`FeedBlock`] for the wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedBlockEnvelope {
    pub blocked: bool,
    pub description: String,
}

impl From<&FeedBlock> for FeedBlockEnvelope {
    fn from(feed_block: &FeedBlock) -> Self {
        Self {
            blocked: feed_block.block_feed_in_cluster,
            description: feed_block.description.clone(),
        }
    }
}

impl From<&FeedBlockEnvelope> for FeedBlock {
    fn from(envelope: &FeedBlockEnvelope) -> Self {
        FeedBlock::new(envelope.blocked, envelope.description.clone())
    }
}

/// The self-describing bundle payload sent over RPC and persisted to the
/// coordination service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEnvelope {
    pub version: u32,
    pub baseline: String,
    pub derived: BTreeMap<String, String>,
    pub feed_block: Option<FeedBlockEnvelope>,
    pub deferred_activation: bool,
}

/// Errors decoding a [`BundleEnvelope`] back into a [`ClusterStateBundle`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed baseline text: {0}")]
    Baseline(#[source] codec::CodecError),
    #[error("malformed derived state text for bucket space {space:?}: {source}")]
    Derived {
        space: String,
        #[source]
        source: codec::CodecError,
    },
    #[error(transparent)]
    Bundle(#[from] ridgeline_bundle::BundleError),
}

/// Builds the wire envelope for `bundle`.
pub fn encode(bundle: &ClusterStateBundle) -> BundleEnvelope {
    let derived = bundle
        .derived()
        .iter()
        .map(|(space, annotated)| (space.as_str().to_string(), codec::encode(&annotated.state)))
        .collect();
    BundleEnvelope {
        version: bundle.version(),
        baseline: codec::encode(&bundle.baseline().state),
        derived,
        feed_block: bundle.feed_block().map(FeedBlockEnvelope::from),
        deferred_activation: bundle.deferred_activation(),
    }
}

/// Parses `envelope` back into a [`ClusterStateBundle`].
pub fn decode(envelope: &BundleEnvelope) -> Result<ClusterStateBundle, EnvelopeError> {
    let baseline_state = codec::parse(&envelope.baseline).map_err(EnvelopeError::Baseline)?;
    let baseline = AnnotatedClusterState::new(baseline_state, GenerationReason::NoOp);

    let mut derived = BTreeMap::new();
    for (space, text) in &envelope.derived {
        let state = codec::parse(text).map_err(|source| EnvelopeError::Derived {
            space: space.clone(),
            source,
        })?;
        derived.insert(
            BucketSpace::new(space.clone()),
            AnnotatedClusterState::new(state, GenerationReason::NoOp),
        );
    }

    let feed_block = envelope.feed_block.as_ref().map(FeedBlock::from);

    let bundle = ClusterStateBundleBuilder::new(baseline)
        .with_explicit_derived(derived)
        .with_feed_block_opt(feed_block)
        .with_deferred_activation(envelope.deferred_activation)
        .build()?;
    Ok(bundle)
}

/// An empty, baseline-only bundle at `version`, used as the conservative
/// fallback requires when decoding fails.
pub fn empty_fallback(version: u32) -> ClusterStateBundle {
    use ridgeline_types::{ClusterFlag, ClusterState};
    let baseline = AnnotatedClusterState::new(ClusterState::new(version, ClusterFlag::Down), GenerationReason::NoOp);
    ClusterStateBundleBuilder::new(baseline)
        .build()
        .expect("empty baseline-only bundle is always valid")
}
