use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::id::NodeId;
use crate::lock::{HierarchyLockState, ParentLockState};
use crate::node::Node;
use crate::registry::Registry;

/// A node whose child list changed during the last edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildrenChanged {
    pub node: NodeId,
}

/// Arena of nodes linked into one or more trees.
///
/// Children are owned through their parent's child list; the parent link is
/// a plain id resolved through the arena. Detached subtrees may live in the
/// same arena until they are attached or removed.
///
/// Structural edits record the nodes whose child lists changed. Nothing is
/// announced until [`Hierarchy::take_changes`] flushes the batch.
#[derive(Debug)]
pub struct Hierarchy {
    nodes: HashMap<NodeId, Node>,
    registry: Arc<Registry>,
    changed: Vec<NodeId>,
    pinned: Option<NodeId>,
}

impl Hierarchy {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            nodes: HashMap::new(),
            registry,
            changed: Vec::new(),
            pinned: None,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn registry_handle(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access for renames, lock changes and component edits. Links
    /// cannot be changed through the returned node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Create a detached node of `kind` with its required components.
    pub fn create(&mut self, kind: &str) -> Result<NodeId> {
        if !self.registry.contains_node_kind(kind) {
            return Err(Error::UnknownNodeKind(kind.to_string()));
        }

        let id = self.fresh_id();
        self.nodes.insert(id, Node::new(id, kind));
        self.add_required_components(id);
        log::trace!("created node {id} of kind `{kind}`");
        Ok(id)
    }

    /// An id not used by any node in the arena.
    pub(crate) fn fresh_id(&self) -> NodeId {
        self.fresh_id_avoiding(&HashSet::new())
    }

    pub(crate) fn fresh_id_avoiding(&self, taken: &HashSet<NodeId>) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.nodes.contains_key(&id) && !taken.contains(&id) {
                return id;
            }
        }
    }

    pub(crate) fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id(), node);
    }

    /// Detach `id` (announcing the change) and drop its whole subtree.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.set_parent_with(id, None, false, true);

        let doomed = self.subtree(id);
        for node in &doomed {
            self.nodes.remove(node);
        }
        self.changed.retain(|node| !doomed.contains(node));
        doomed.len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.changed.clear();
        self.pinned = None;
    }

    /// Node that may never be given a parent, usually an asset's root.
    pub fn pinned(&self) -> Option<NodeId> {
        self.pinned
    }

    pub(crate) fn pin(&mut self, id: NodeId) {
        self.pinned = Some(id);
    }

    /// Drop every live link touching `ids`: their own parent and child
    /// lists, and their entries in any other node's child list.
    pub(crate) fn unlink(&mut self, ids: &HashSet<NodeId>) {
        for (id, node) in &mut self.nodes {
            if ids.contains(id) {
                node.parent = None;
                node.children.clear();
            } else {
                node.children.retain(|child| !ids.contains(child));
            }
        }
    }

    /// Checked re-parent. `None` detaches.
    ///
    /// Returns whether the node's parent now equals `new_parent`. A request
    /// that is already satisfied returns `true` without announcing anything.
    pub fn set_parent(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> bool {
        self.set_parent_with(node, new_parent, true, true)
    }

    /// Re-parent with optional legality checks and change recording.
    ///
    /// The unchecked silent form exists for bulk rebuilds from a validated
    /// flat list.
    pub(crate) fn set_parent_with(
        &mut self,
        node: NodeId,
        new_parent: Option<NodeId>,
        validate: bool,
        notify: bool,
    ) -> bool {
        let Some(old_parent) = self.nodes.get(&node).map(Node::parent) else {
            return false;
        };
        if old_parent == new_parent {
            return true;
        }
        if new_parent.is_some_and(|parent| !self.contains(parent))
            || (self.pinned == Some(node) && new_parent.is_some())
        {
            return false;
        }
        if validate && !self.can_set_parent(node, new_parent) {
            log::debug!("rejected moving node {node} under {new_parent:?}");
            return false;
        }

        if let Some(old) = old_parent {
            if let Some(parent) = self.nodes.get_mut(&old) {
                parent.children.retain(|&child| child != node);
            }
            if notify {
                self.notify_children_changed(old);
            }
        }

        if let Some(parent) =
            new_parent.and_then(|target| self.nodes.get_mut(&target))
        {
            parent.children.push(node);
        }
        if let Some(moved) = self.nodes.get_mut(&node) {
            moved.parent = new_parent;
            moved.parent_id = new_parent.unwrap_or(NodeId::UNSET);
        }
        if let (true, Some(target)) = (notify, new_parent) {
            self.notify_children_changed(target);
        }

        true
    }

    /// Attach `child` to `parent` and move it to `index`, clamped to the
    /// child count.
    ///
    /// Re-inserting an existing child is a reorder: the child list keeps its
    /// members, so locks do not apply, and the change is always announced.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> bool {
        if !self.contains(parent) || !self.contains(child) {
            return false;
        }

        let reorder = self.parent_of(child) == Some(parent);
        if !reorder && !self.set_parent(child, Some(parent)) {
            return false;
        }

        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&id| id != child);
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if reorder {
            self.notify_children_changed(parent);
        }
        true
    }

    /// Legality of moving `node` under `new_parent` without performing it.
    pub fn can_set_parent(
        &self,
        node: NodeId,
        new_parent: Option<NodeId>,
    ) -> bool {
        let Some(current) = self.nodes.get(&node) else {
            return false;
        };
        if current.parent_lock() == ParentLockState::Locked
            || self.pinned == Some(node)
        {
            return false;
        }
        if current.parent() == new_parent || new_parent == Some(node) {
            return false;
        }
        if new_parent.is_some_and(|parent| !self.contains(parent)) {
            return false;
        }
        if !self.is_valid_attachment_point(current.parent())
            || !self.is_valid_attachment_point(new_parent)
        {
            return false;
        }
        !new_parent.is_some_and(|parent| self.has_ancestor(parent, node))
    }

    /// A node may gain or lose children iff it is unlocked and no ancestor
    /// locks its hierarchy. `None` (detached) always qualifies.
    pub fn is_valid_attachment_point(&self, parent: Option<NodeId>) -> bool {
        let Some(parent) = parent else {
            return true;
        };
        self.nodes.get(&parent).is_some_and(|node| {
            node.hierarchy_lock() == HierarchyLockState::None
                && !self.is_in_locked_hierarchy(parent)
        })
    }

    /// Directly locked, pinned by a children-locked parent or inside a locked
    /// hierarchy.
    pub fn parent_locked(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        node.parent_lock() == ParentLockState::Locked
            || node
                .parent()
                .and_then(|parent| self.nodes.get(&parent))
                .is_some_and(Node::is_children_locked)
            || self.is_in_locked_hierarchy(id)
    }

    /// Whether any ancestor locks its hierarchy.
    pub fn is_in_locked_hierarchy(&self, id: NodeId) -> bool {
        self.ancestors(id).into_iter().any(|ancestor| {
            self.nodes
                .get(&ancestor)
                .is_some_and(Node::is_hierarchy_locked)
        })
    }

    pub fn children_locked(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(Node::is_children_locked)
    }

    pub fn hierarchy_locked(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(Node::is_hierarchy_locked)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(Node::parent)
    }

    /// Parent chain, nearest first. Empty for a root or an unknown node.
    ///
    /// # Panics
    ///
    /// Panics if the parent chain loops.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(ancestor) = current {
            if chain.len() >= self.nodes.len() {
                panic!("{}", Error::CyclicHierarchy(id));
            }
            chain.push(ancestor);
            current = self.parent_of(ancestor);
        }
        chain
    }

    pub fn has_ancestor(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        Some(self.ancestors(id).last().copied().unwrap_or(id))
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes.get(&id).map_or(0, Node::child_count)
    }

    pub fn child(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.nodes.get(&parent).and_then(|node| node.child(index))
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes.get(&parent).and_then(|node| node.index_of(child))
    }

    /// `start` and everything below it, pre-order.
    ///
    /// # Panics
    ///
    /// Panics if a child list leads back into the walk.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited = Vec::new();
        if !self.contains(start) {
            return visited;
        }

        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if visited.len() >= self.nodes.len() {
                panic!("{}", Error::CyclicHierarchy(start));
            }
            visited.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children().iter().rev().copied());
            }
        }
        visited
    }

    /// Everything below `start`, pre-order.
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut all = self.subtree(start);
        if !all.is_empty() {
            all.remove(0);
        }
        all
    }

    /// Depth-first search for `id` starting at `start` itself.
    pub fn find_from(&self, start: NodeId, id: NodeId) -> Option<NodeId> {
        self.subtree(start).into_iter().find(|&node| node == id)
    }

    /// First node named `name` in the subtree of `start`, pre-order.
    pub fn find_by_name_from(
        &self,
        start: NodeId,
        name: &str,
    ) -> Option<NodeId> {
        self.subtree(start).into_iter().find(|id| {
            self.nodes.get(id).is_some_and(|node| node.name() == name)
        })
    }

    /// Follow child indices from `start`.
    pub fn child_at_path(
        &self,
        start: NodeId,
        path: &[usize],
    ) -> Option<NodeId> {
        if !self.contains(start) {
            return None;
        }
        path.iter()
            .try_fold(start, |current, &index| self.child(current, index))
    }

    /// Child index taken at each level from the root down to `id`. Empty for
    /// a root.
    pub fn indexed_path(&self, id: NodeId) -> Result<Vec<usize>> {
        if !self.contains(id) {
            return Err(Error::MissingNode(id));
        }

        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if path.len() >= self.nodes.len() {
                return Err(Error::CyclicHierarchy(id));
            }
            let index = self
                .index_of(parent, current)
                .ok_or(Error::BrokenLink { parent, child: current })?;
            path.push(index);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Record a child-list change at `id` and every ancestor. Each node is
    /// recorded once per batch.
    pub(crate) fn notify_children_changed(&mut self, id: NodeId) {
        let mut chain = vec![id];
        chain.extend(self.ancestors(id));
        for node in chain {
            if !self.changed.contains(&node) {
                self.changed.push(node);
            }
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Flush the recorded batch: run each changed node's kind hook, then hand
    /// the batch to the caller, deepest recorded node first.
    pub fn take_changes(&mut self) -> Vec<ChildrenChanged> {
        let changed = std::mem::take(&mut self.changed);
        let registry = Arc::clone(&self.registry);

        for &id in &changed {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let hook = registry
                .node_kind(node.kind())
                .and_then(|kind| kind.children_changed_hook());
            if let Some(hook) = hook {
                hook(node);
            }
        }

        changed
            .into_iter()
            .filter(|id| self.nodes.contains_key(id))
            .map(|node| ChildrenChanged { node })
            .collect()
    }

    /// Drop the recorded batch without running hooks.
    pub(crate) fn discard_changes(&mut self) {
        self.changed.clear();
    }
}
