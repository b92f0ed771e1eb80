use crate::asset::NodeAsset;
use crate::duplicator::{flatten, instantiate};
use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::node::Node;
use crate::reorder::uppermost;

/// Copied subtrees waiting to be pasted.
///
/// Entries are detached deep copies, so edits made to the originals after
/// copying never show up in a paste.
#[derive(Debug, Default, Clone)]
pub struct Clipboard {
    entries: Vec<Vec<Node>>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of copied subtrees.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the clipboard with copies of `nodes`.
    ///
    /// The root, parent-locked nodes, nodes inside a locked hierarchy and
    /// nodes whose ancestor is also copied are skipped. Returns how many
    /// subtrees were copied.
    pub fn copy(
        &mut self,
        asset: &NodeAsset,
        nodes: &[NodeId],
    ) -> Result<usize> {
        let hierarchy = asset.hierarchy();
        let copyable: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|&node| {
                node != asset.root()
                    && hierarchy.contains(node)
                    && !hierarchy.parent_locked(node)
                    && !hierarchy.is_in_locked_hierarchy(node)
            })
            .collect();

        let entries = uppermost(hierarchy, &copyable)
            .into_iter()
            .map(|node| flatten(hierarchy, node))
            .collect::<Result<Vec<_>>>()?;
        self.entries = entries;
        Ok(self.entries.len())
    }

    /// Copy `nodes`, then delete the copied ones from `asset`.
    pub fn cut(
        &mut self,
        asset: &mut NodeAsset,
        nodes: &[NodeId],
    ) -> Result<usize> {
        let copied = self.copy(asset, nodes)?;
        let doomed = uppermost(asset.hierarchy(), nodes);
        for node in doomed {
            asset.delete(node);
        }
        Ok(copied)
    }

    /// Attach fresh copies of every entry under `parent`.
    ///
    /// A locked `parent` yields an empty list. Kinds are checked against the
    /// receiving asset before anything is inserted.
    pub fn paste(
        &self,
        asset: &mut NodeAsset,
        parent: NodeId,
    ) -> Result<Vec<NodeId>> {
        if !asset.can_add_children(parent) {
            log::debug!("rejected paste under locked node {parent}");
            return Ok(Vec::new());
        }
        for node in self.entries.iter().flatten() {
            asset.check_kind(node.kind())?;
            let registry = asset.registry();
            if let Some(slot) = node
                .components()
                .iter()
                .find(|slot| !registry.contains_component_kind(slot.kind()))
            {
                let kind = slot.kind().to_string();
                return Err(Error::UnknownComponentKind(kind));
            }
        }

        let mut pasted = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let hierarchy = asset.hierarchy_mut();
            let copy = instantiate(hierarchy, entry.clone())?;
            if hierarchy.set_parent(copy, Some(parent)) {
                pasted.push(copy);
            } else {
                hierarchy.remove_subtree(copy);
            }
        }
        asset.commit();
        Ok(pasted)
    }
}
