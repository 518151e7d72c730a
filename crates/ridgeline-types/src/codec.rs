//! Canonical human-readable text encoding of a [`ClusterState`].
//!
//! Form: `version:<n> cluster:<u|d> <nodeType>.<index>.s:<code>[,i:<progress>][,m:<bits>][,c:<capacity>][,desc:<text>] ...`
//!
//! Tokens are space-separated; per-node detail fields are comma-separated
//! after the mandatory `s:` tag. This mirrors the wire format operators
//! read directly off a coordination-service dump, so it favors readability
//! over compactness -- `postcard` carries the binary envelope instead.

use std::fmt::Write as _;

use thiserror::Error;

use crate::cluster_state::{ClusterFlag, ClusterState};
use crate::node_id::{NodeId, NodeIdParseError};
use crate::node_state::{NodeState, NodeStateTag};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing required token: {0}")]
    MissingToken(&'static str),
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    #[error("unknown cluster flag code: {0}")]
    UnknownClusterFlag(char),
    #[error("unknown node state code: {0}")]
    UnknownNodeStateCode(char),
    #[error(transparent)]
    NodeId(#[from] NodeIdParseError),
    #[error("invalid numeric field {field}: {value}")]
    InvalidNumericField { field: &'static str, value: String },
}

pub fn encode(state: &ClusterState) -> String {
    let mut out = String::new();
    write!(out, "version:{} cluster:{}", state.version, state.cluster_flag.code())
        .expect("writing to a String never fails");
    for (id, node_state) in state.nodes() {
        out.push(' ');
        encode_node(&mut out, *id, node_state);
    }
    out
}

fn encode_node(out: &mut String, id: NodeId, state: &NodeState) {
    write!(out, "{id}.s:").expect("writing to a String never fails");
    encode_state_fields(out, state);
}

/// Encodes a single node's state as `<code>[,i:<progress>][,m:<bits>][,c:<capacity>][,desc:<text>]`,
/// without the leading `<nodeType>.<index>.s:` tag. Shared by the full
/// `ClusterState` text form here and by `ridgeline-coordination`'s
/// `wantedstates` znode format, which uses the same per-state encoding
/// keyed by node id rather than embedded in a whole-cluster line.
pub fn encode_state_fields(out: &mut String, state: &NodeState) {
    write!(out, "{}", state.tag.code()).expect("writing to a String never fails");
    if let Some(progress) = state.init_progress {
        write!(out, ",i:{progress}").expect("writing to a String never fails");
    }
    if let Some(bits) = state.min_used_bits {
        write!(out, ",m:{bits}").expect("writing to a String never fails");
    }
    if let Some(capacity) = state.capacity {
        write!(out, ",c:{capacity}").expect("writing to a String never fails");
    }
    if let Some(description) = &state.description {
        write!(out, ",desc:{description}").expect("writing to a String never fails");
    }
}

pub fn parse(text: &str) -> Result<ClusterState, CodecError> {
    let mut tokens = text.split_whitespace();

    let version_token = tokens.next().ok_or(CodecError::MissingToken("version"))?;
    let version: u32 = version_token
        .strip_prefix("version:")
        .ok_or_else(|| CodecError::MalformedToken(version_token.to_string()))?
        .parse()
        .map_err(|_| CodecError::InvalidVersion(version_token.to_string()))?;

    let cluster_token = tokens.next().ok_or(CodecError::MissingToken("cluster"))?;
    let cluster_code = cluster_token
        .strip_prefix("cluster:")
        .and_then(|s| s.chars().next())
        .ok_or_else(|| CodecError::MalformedToken(cluster_token.to_string()))?;
    let cluster_flag =
        ClusterFlag::from_code(cluster_code).ok_or(CodecError::UnknownClusterFlag(cluster_code))?;

    let mut state = ClusterState::new(version, cluster_flag);
    for token in tokens {
        let (id, node_state) = parse_node(token)?;
        state.set_node(id, node_state);
    }
    Ok(state)
}

fn parse_node(token: &str) -> Result<(NodeId, NodeState), CodecError> {
    let (id_part, fields_part) = token
        .split_once(".s:")
        .ok_or_else(|| CodecError::MalformedToken(token.to_string()))?;
    let id: NodeId = id_part.parse()?;

    let mut fields = fields_part.split(',');
    let code = fields
        .next()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| CodecError::MalformedToken(token.to_string()))?;
    let tag = NodeStateTag::from_code(code).ok_or(CodecError::UnknownNodeStateCode(code))?;
    let mut state = NodeState::new(tag);

    for field in fields {
        if let Some(value) = field.strip_prefix("i:") {
            state.init_progress = Some(value.parse().map_err(|_| CodecError::InvalidNumericField {
                field: "i",
                value: value.to_string(),
            })?);
        } else if let Some(value) = field.strip_prefix("m:") {
            state.min_used_bits = Some(value.parse().map_err(|_| CodecError::InvalidNumericField {
                field: "m",
                value: value.to_string(),
            })?);
        } else if let Some(value) = field.strip_prefix("c:") {
            state.capacity = Some(value.parse().map_err(|_| CodecError::InvalidNumericField {
                field: "c",
                value: value.to_string(),
            })?);
        } else if let Some(value) = field.strip_prefix("desc:") {
            state.description = Some(value.to_string());
        } else if !field.is_empty() {
            return Err(CodecError::MalformedToken(field.to_string()));
        }
    }
    Ok((id, state))
}
