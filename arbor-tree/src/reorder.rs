use std::collections::HashSet;

use crate::asset::NodeAsset;
use crate::hierarchy::Hierarchy;
use crate::id::NodeId;

/// Where a set of dragged nodes is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// Onto a node: the dragged nodes are appended to its children.
    Upon(NodeId),
    /// Into the gap before `parent`'s child at `index`, counted in the child
    /// list as it was before the move. `index == child_count` is the end.
    Between { parent: NodeId, index: usize },
    /// Onto empty space: the dragged nodes are appended to the root.
    Outside,
}

/// Convert a gap index in `parent`'s current child list into the index
/// `node` must be inserted at once it has been taken out of that list.
pub fn adjusted_insert_index(
    hierarchy: &Hierarchy,
    parent: NodeId,
    node: NodeId,
    index: usize,
) -> usize {
    match hierarchy.index_of(parent, node) {
        Some(current) if index > current => index - 1,
        _ => index,
    }
}

/// `nodes` without repeats and without any node whose ancestor is also
/// listed. Order is kept.
pub fn uppermost(hierarchy: &Hierarchy, nodes: &[NodeId]) -> Vec<NodeId> {
    let listed: HashSet<NodeId> = nodes.iter().copied().collect();
    let mut seen = HashSet::new();
    nodes
        .iter()
        .copied()
        .filter(|&node| seen.insert(node))
        .filter(|&node| {
            !hierarchy
                .ancestors(node)
                .iter()
                .any(|ancestor| listed.contains(ancestor))
        })
        .collect()
}

impl NodeAsset {
    fn drop_target(&self, position: DropPosition) -> NodeId {
        match position {
            DropPosition::Upon(parent)
            | DropPosition::Between { parent, .. } => parent,
            DropPosition::Outside => self.root(),
        }
    }

    /// Whether `position` accepts dropped nodes at all.
    pub fn can_accept_drop(&self, position: DropPosition) -> bool {
        let target = self.drop_target(position);
        self.find(target).is_some()
            && self.hierarchy().is_valid_attachment_point(Some(target))
    }

    /// The root and parent-locked nodes cannot be dragged.
    pub fn can_start_drag(&self, node: NodeId) -> bool {
        node != self.root()
            && self.find(node).is_some()
            && !self.hierarchy().parent_locked(node)
    }

    /// Move dragged nodes to `position` and announce the result once.
    ///
    /// Nodes that cannot be dragged, the target itself and nodes whose
    /// ancestor is also dragged are ignored. For [`DropPosition::Between`]
    /// the moved nodes end up next to each other in drag order, before the
    /// first child at or after the gap that is not itself being moved.
    /// Returns how many nodes were placed.
    pub fn drop_nodes(
        &mut self,
        nodes: &[NodeId],
        position: DropPosition,
    ) -> usize {
        if !self.can_accept_drop(position) {
            log::debug!("rejected drop at {position:?}");
            return 0;
        }
        let target = self.drop_target(position);

        let candidates: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|&node| node != target && self.can_start_drag(node))
            .collect();
        let moving = uppermost(self.hierarchy(), &candidates);

        let anchor = match position {
            DropPosition::Between { index, .. } => {
                let moving_set: HashSet<NodeId> =
                    moving.iter().copied().collect();
                self.hierarchy()
                    .node(target)
                    .and_then(|node| {
                        node.children()
                            .iter()
                            .skip(index)
                            .find(|child| !moving_set.contains(child))
                            .copied()
                    })
            }
            DropPosition::Upon(_) | DropPosition::Outside => None,
        };

        let hierarchy = self.hierarchy_mut();
        let mut placed = 0;
        for node in moving {
            let accepted = match position {
                DropPosition::Between { .. } => {
                    let index = anchor
                        .and_then(|anchor| hierarchy.index_of(target, anchor))
                        .map_or(usize::MAX, |anchor_index| {
                            adjusted_insert_index(
                                hierarchy,
                                target,
                                node,
                                anchor_index,
                            )
                        });
                    hierarchy.insert_child(target, index, node)
                }
                DropPosition::Upon(_) | DropPosition::Outside => {
                    hierarchy.set_parent(node, Some(target))
                }
            };
            if accepted {
                placed += 1;
            }
        }

        self.commit();
        placed
    }
}
