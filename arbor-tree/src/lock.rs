use std::fmt;

use serde::{Deserialize, Serialize};

/// Restricts structural edits to a node's children or to its whole subtree.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLockState {
    /// Children may be freely added and removed, except those whose parent
    /// is locked.
    #[default]
    None,
    /// No child may be added to or removed from this node. Grandchildren are
    /// unaffected.
    ChildrenLocked,
    /// No node may be added to or removed from anywhere in this subtree.
    HierarchyLocked,
}

/// Restricts whether a node itself may be re-parented.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ParentLockState {
    /// Movable unless an ancestor's hierarchy lock says otherwise.
    #[default]
    Auto,
    /// Never movable.
    Locked,
}

impl fmt::Display for HierarchyLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HierarchyLockState::None => "None",
            HierarchyLockState::ChildrenLocked => "Children Locked",
            HierarchyLockState::HierarchyLocked => "Hierarchy Locked",
        };
        write!(f, "{label}")
    }
}

impl fmt::Display for ParentLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParentLockState::Auto => "Auto",
            ParentLockState::Locked => "Locked",
        };
        write!(f, "{label}")
    }
}
