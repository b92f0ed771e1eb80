use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentSlot;
use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::lock::{HierarchyLockState, ParentLockState};
use crate::node::Node;
use crate::registry::Registry;

/// Flat, persisted form of one node.
///
/// Only `parent_id` links a record to its parent; live links are rebuilt on
/// load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: NodeId,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub hierarchy_lock: HierarchyLockState,
    #[serde(default)]
    pub parent_lock: ParentLockState,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

/// Persisted payload of one attached component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Container payload: every node reachable from the root, pre-order, root
/// first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFile {
    #[serde(default)]
    pub selected_id: NodeId,
    pub nodes: Vec<NodeRecord>,
}

/// Export payload for a single subtree, pre-order, subtree root first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtreeFile {
    pub nodes: Vec<NodeRecord>,
}

/// Rebuild a detached node from its record. Links stay empty.
pub(crate) fn decode_node(
    registry: &Registry,
    record: NodeRecord,
) -> Result<Node> {
    if !registry.contains_node_kind(&record.kind) {
        return Err(Error::UnknownNodeKind(record.kind));
    }

    let mut components = Vec::with_capacity(record.components.len());
    for component in record.components {
        let Some(info) = registry.component_kind(&component.kind) else {
            return Err(Error::UnknownComponentKind(component.kind));
        };
        let instance = (info.decode)(component.data)?;
        components.push(ComponentSlot::new(
            record.id,
            instance,
            component.required,
        ));
    }

    Ok(Node::from_parts(
        record.id,
        record.parent_id,
        record.kind,
        &record.name,
        record.hierarchy_lock,
        record.parent_lock,
        components,
    ))
}

/// Check `(id, parent_id)` pairs of a flat node list and return the index of
/// its root.
///
/// The root is the only entry whose `parent_id` does not resolve inside the
/// list. Every other entry must reach the root by following parent ids.
pub(crate) fn validate_links(links: &[(NodeId, NodeId)]) -> Result<usize> {
    if links.is_empty() {
        return Err(Error::EmptyNodeList);
    }

    let mut positions = HashMap::with_capacity(links.len());
    for (position, &(id, _)) in links.iter().enumerate() {
        if id.is_unset() {
            return Err(Error::UnsetId);
        }
        if positions.insert(id, position).is_some() {
            return Err(Error::DuplicateId(id));
        }
    }

    let mut root = None;
    for (position, &(id, parent_id)) in links.iter().enumerate() {
        if positions.contains_key(&parent_id) {
            continue;
        }
        if root.is_some() {
            return Err(Error::OrphanedParent { id, parent_id });
        }
        root = Some(position);
    }
    let root = root.ok_or(Error::MissingRoot)?;
    let root_id = links[root].0;

    for &(id, _) in links {
        let mut current = id;
        let mut steps = 0;
        while current != root_id {
            steps += 1;
            if steps > links.len() {
                return Err(Error::CyclicHierarchy(id));
            }
            current = links[positions[&current]].1;
        }
    }

    Ok(root)
}
