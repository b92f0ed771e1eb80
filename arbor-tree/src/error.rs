use std::io;

use thiserror::Error;

use crate::id::NodeId;

/// Errors produced while building registries, loading node data or walking
/// a corrupted hierarchy.
///
/// Rejected structural requests (an illegal reparent, a refused component)
/// are not errors; those calls return `false` or `None`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown node kind `{0}`")]
    UnknownNodeKind(String),

    #[error("unknown component kind `{0}`")]
    UnknownComponentKind(String),

    #[error("node kind `{0}` is already registered")]
    DuplicateNodeKind(String),

    #[error("component kind `{0}` is already registered")]
    DuplicateComponentKind(String),

    #[error("node kind `{0}` has a cyclic base chain")]
    CyclicKindBase(String),

    #[error("node kind `{kind}` does not derive from `{expected}`")]
    KindMismatch { kind: String, expected: String },

    #[error("node {0} does not exist")]
    MissingNode(NodeId),

    #[error("node list is empty")]
    EmptyNodeList,

    #[error("node id 0 is reserved")]
    UnsetId,

    #[error("node id {0} appears more than once")]
    DuplicateId(NodeId),

    #[error("node {id} references missing parent {parent_id}")]
    OrphanedParent { id: NodeId, parent_id: NodeId },

    #[error("node list has no root")]
    MissingRoot,

    #[error("cyclic parent chain detected at node {0}")]
    CyclicHierarchy(NodeId),

    #[error("node {child} is not listed among the children of {parent}")]
    BrokenLink { parent: NodeId, child: NodeId },

    #[error("component `{0}` is not attached")]
    MissingComponent(&'static str),

    #[error("node JSON failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("asset IO failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
