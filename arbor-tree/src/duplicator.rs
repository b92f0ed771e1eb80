//! Deep copies of node subtrees.
//!
//! A subtree is flattened into detached node copies (pre-order, subtree root
//! first) that carry only persisted parent ids. Instantiating such a list
//! checks its links, rebuilds the child lists in list order and hands every
//! node a fresh id from the root down. In-memory duplication and JSON
//! export/import share this path; JSON only adds the record encoding.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::hierarchy::Hierarchy;
use crate::id::NodeId;
use crate::node::Node;
use crate::options::JsonStyle;
use crate::record::{NodeRecord, SubtreeFile, decode_node, validate_links};

/// Detached copies of the subtree under `root`. The copy of `root` has no
/// parent id.
pub(crate) fn flatten(
    hierarchy: &Hierarchy,
    root: NodeId,
) -> Result<Vec<Node>> {
    if !hierarchy.contains(root) {
        return Err(Error::MissingNode(root));
    }

    let mut nodes = Vec::new();
    for id in hierarchy.subtree(root) {
        let node = hierarchy.node(id).ok_or(Error::MissingNode(id))?;
        let mut copy = node.detached_copy();
        copy.parent_id = match node.parent() {
            Some(parent) if id != root => parent,
            _ => NodeId::UNSET,
        };
        nodes.push(copy);
    }
    Ok(nodes)
}

/// Insert a flat list as a new detached subtree and return its root.
///
/// Links are resolved within the list only. Every node, the root included,
/// gets an id unused in `hierarchy`.
pub(crate) fn instantiate(
    hierarchy: &mut Hierarchy,
    nodes: Vec<Node>,
) -> Result<NodeId> {
    let links: Vec<(NodeId, NodeId)> =
        nodes.iter().map(|node| (node.id(), node.parent_id())).collect();
    let root = validate_links(&links)?;

    let positions: HashMap<NodeId, usize> = links
        .iter()
        .enumerate()
        .map(|(position, &(id, _))| (id, position))
        .collect();
    let mut children = vec![Vec::new(); links.len()];
    let mut parents = vec![None; links.len()];
    for (position, &(_, parent_id)) in links.iter().enumerate() {
        if position == root {
            continue;
        }
        if let Some(&parent) = positions.get(&parent_id) {
            children[parent].push(position);
            parents[position] = Some(parent);
        }
    }

    let mut fresh = vec![NodeId::UNSET; links.len()];
    let mut taken = HashSet::with_capacity(links.len());
    let mut stack = vec![root];
    while let Some(position) = stack.pop() {
        let id = hierarchy.fresh_id_avoiding(&taken);
        taken.insert(id);
        fresh[position] = id;
        stack.extend(children[position].iter().rev().copied());
    }

    for (position, mut node) in nodes.into_iter().enumerate() {
        let parent = parents[position].map(|parent: usize| fresh[parent]);
        let child_ids =
            children[position].iter().map(|&child| fresh[child]).collect();
        node.relink(fresh[position], parent, child_ids);
        hierarchy.insert_node(node);
    }

    log::trace!("instantiated {} nodes under {}", links.len(), fresh[root]);
    Ok(fresh[root])
}

/// Copy the subtree under `node` as a new detached subtree. The copy shares
/// no ids or component state with the source.
pub fn duplicate(hierarchy: &mut Hierarchy, node: NodeId) -> Result<NodeId> {
    let nodes = flatten(hierarchy, node)?;
    instantiate(hierarchy, nodes)
}

/// Export the subtree under `node` as a [`SubtreeFile`] JSON document.
pub fn save_as_json(
    hierarchy: &Hierarchy,
    node: NodeId,
    style: JsonStyle,
) -> Result<String> {
    let nodes = flatten(hierarchy, node)?
        .iter()
        .map(Node::to_record)
        .collect::<Result<Vec<_>>>()?;
    Ok(style.render(&SubtreeFile { nodes })?)
}

pub(crate) fn parse_subtree(json: &str) -> Result<SubtreeFile> {
    Ok(serde_json::from_str(json)?)
}

/// Decode records against the hierarchy's registry and instantiate them.
pub(crate) fn instantiate_records(
    hierarchy: &mut Hierarchy,
    records: Vec<NodeRecord>,
) -> Result<NodeId> {
    let nodes = records
        .into_iter()
        .map(|record| decode_node(hierarchy.registry(), record))
        .collect::<Result<Vec<_>>>()?;
    instantiate(hierarchy, nodes)
}

/// Import a subtree exported by [`save_as_json`] as a new detached subtree
/// with fresh ids.
pub fn load_from_json(hierarchy: &mut Hierarchy, json: &str) -> Result<NodeId> {
    let file = parse_subtree(json)?;
    instantiate_records(hierarchy, file.nodes)
}

/// Like [`load_from_json`], but the loaded root must be of kind `kind` or
/// derive from it. A mismatching subtree is discarded.
pub fn load_from_json_as(
    hierarchy: &mut Hierarchy,
    json: &str,
    kind: &str,
) -> Result<NodeId> {
    let root = load_from_json(hierarchy, json)?;
    ensure_root_kind(hierarchy, root, kind)
}

/// Keep the detached subtree under `root` only if its kind derives from
/// `kind`.
pub(crate) fn ensure_root_kind(
    hierarchy: &mut Hierarchy,
    root: NodeId,
    kind: &str,
) -> Result<NodeId> {
    let root_kind = hierarchy
        .node(root)
        .map(|node| node.kind().to_string())
        .ok_or(Error::MissingNode(root))?;

    if !hierarchy.registry().is_assignable(&root_kind, kind) {
        hierarchy.remove_subtree(root);
        return Err(Error::KindMismatch {
            kind: root_kind,
            expected: kind.to_string(),
        });
    }
    Ok(root)
}
