use std::collections::{HashMap, HashSet};
use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::duplicator;
use crate::error::{Error, Result};
use crate::hierarchy::{ChildrenChanged, Hierarchy};
use crate::id::NodeId;
use crate::node::Node;
use crate::options::AssetOptions;
use crate::record::{AssetFile, decode_node, validate_links};
use crate::registry::{MenuEntry, Registry};

/// Callbacks an embedding application can run at asset lifecycle points.
pub trait AssetHooks {
    /// Called at the end of every [`NodeAsset::enable`].
    fn initialize(&mut self, _asset: &NodeAsset) -> Result<()> {
        Ok(())
    }

    /// Called after an edit reached the root and the node list was
    /// recompiled, before listeners run.
    fn graph_changed(
        &mut self,
        _asset: &NodeAsset,
        _changes: &[ChildrenChanged],
    ) {
    }
}

impl AssetHooks for () {}

/// Handle returned by [`NodeAsset::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&NodeAsset, ChildrenChanged)>;

struct Subscription {
    id: ListenerId,
    node: NodeId,
    listener: Listener,
}

type Template = Box<dyn FnOnce(&mut NodeAsset) -> Result<()>>;

/// Builder for a [`NodeAsset`] with a fresh or restored hierarchy.
#[must_use]
pub struct AssetBuilder {
    registry: Arc<Registry>,
    options: AssetOptions,
    root_kind: Option<String>,
    hooks: Box<dyn AssetHooks>,
    template: Option<Template>,
}

impl AssetBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            options: AssetOptions::default(),
            root_kind: None,
            hooks: Box::new(()),
            template: None,
        }
    }

    pub fn options(mut self, options: AssetOptions) -> Self {
        self.options = options;
        self
    }

    /// Kind of a freshly built root. Defaults to the base kind.
    pub fn root_kind(mut self, kind: impl Into<String>) -> Self {
        self.root_kind = Some(kind.into());
        self
    }

    pub fn hooks(mut self, hooks: impl AssetHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Populate a freshly built asset before it is enabled.
    pub fn template(
        mut self,
        template: impl FnOnce(&mut NodeAsset) -> Result<()> + 'static,
    ) -> Self {
        self.template = Some(Box::new(template));
        self
    }

    /// Create the root, run the template and enable the asset.
    pub fn build(self) -> Result<NodeAsset> {
        let Self {
            registry,
            options,
            root_kind,
            hooks,
            template,
        } = self;

        let mut asset = NodeAsset::empty(registry, options, hooks);
        let kind = root_kind.unwrap_or_else(|| asset.options.base_kind.clone());
        asset.check_kind(&kind)?;

        let root = asset.hierarchy.create(&kind)?;
        if let Some(node) = asset.hierarchy.node_mut(root) {
            node.set_name(&asset.options.root_name);
        }
        asset.root = root;
        asset.hierarchy.pin(root);
        asset.nodes = vec![root];

        if let Some(template) = template {
            template(&mut asset)?;
        }
        asset.enable()?;
        Ok(asset)
    }

    /// Rebuild an asset from persisted state instead of creating a root.
    pub fn restore(self, file: AssetFile) -> Result<NodeAsset> {
        let Self {
            registry,
            options,
            hooks,
            ..
        } = self;

        let mut asset = NodeAsset::empty(registry, options, hooks);
        asset.restore(file)?;
        Ok(asset)
    }
}

/// Owner of one node tree and its flattened, pre-order node list.
///
/// Every structural call on the asset is committed before it returns: the
/// node list is recompiled if the edit reached the root, then
/// [`AssetHooks::graph_changed`] and subscribed listeners run. Listeners
/// therefore always observe an up-to-date list.
pub struct NodeAsset {
    hierarchy: Hierarchy,
    options: AssetOptions,
    root: NodeId,
    nodes: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
    selected_id: NodeId,
    subscriptions: Vec<Subscription>,
    next_listener: u64,
    hooks: Box<dyn AssetHooks>,
}

impl NodeAsset {
    pub fn builder(registry: Arc<Registry>) -> AssetBuilder {
        AssetBuilder::new(registry)
    }

    fn empty(
        registry: Arc<Registry>,
        options: AssetOptions,
        hooks: Box<dyn AssetHooks>,
    ) -> Self {
        Self {
            hierarchy: Hierarchy::new(registry),
            options,
            root: NodeId::UNSET,
            nodes: Vec::new(),
            positions: HashMap::new(),
            selected_id: NodeId::UNSET,
            subscriptions: Vec::new(),
            next_listener: 0,
            hooks,
        }
    }

    /// Rebuild live links from persisted parent ids, recompile the node list
    /// and run [`AssetHooks::initialize`]. Safe to call repeatedly.
    pub fn enable(&mut self) -> Result<()> {
        self.commit();
        self.rebuild_hierarchy()?;
        self.recompile_node_list();
        self.hierarchy.discard_changes();

        let mut hooks = mem::replace(&mut self.hooks, Box::new(()));
        let result = hooks.initialize(self);
        self.hooks = hooks;
        result
    }

    /// Relink every listed node to the node matching its persisted parent id.
    ///
    /// Child order follows list order. Links are checked first; a list with
    /// no root, an orphaned parent id or a cycle is rejected untouched.
    pub fn rebuild_hierarchy(&mut self) -> Result<()> {
        let links = self
            .nodes
            .iter()
            .map(|&id| {
                self.hierarchy
                    .node(id)
                    .map(|node| (id, node.parent_id()))
                    .ok_or(Error::MissingNode(id))
            })
            .collect::<Result<Vec<_>>>()?;
        let root = validate_links(&links)?;
        let root_id = links[root].0;

        let listed: HashSet<NodeId> = links.iter().map(|&(id, _)| id).collect();
        self.hierarchy.unlink(&listed);
        self.hierarchy.pin(root_id);
        for &(id, parent_id) in &links {
            if id == root_id {
                continue;
            }
            self.hierarchy.set_parent_with(id, Some(parent_id), false, false);
        }
        if let Some(node) = self.hierarchy.node_mut(root_id) {
            node.parent_id = NodeId::UNSET;
        }

        self.root = root_id;
        Ok(())
    }

    /// Refill the node list from the live tree, pre-order from the root, and
    /// resync every persisted parent id.
    pub fn recompile_node_list(&mut self) {
        let order = self.hierarchy.subtree(self.root);
        for &id in &order {
            let parent = self.hierarchy.parent_of(id);
            if let Some(node) = self.hierarchy.node_mut(id) {
                node.parent_id = parent.unwrap_or(NodeId::UNSET);
            }
        }

        self.positions = order
            .iter()
            .enumerate()
            .map(|(position, &id)| (id, position))
            .collect();
        self.nodes = order;
        log::trace!("recompiled node list with {} nodes", self.nodes.len());
    }

    /// Flush pending changes: recompile, run hooks, then notify listeners.
    pub(crate) fn commit(&mut self) {
        if !self.hierarchy.contains(self.selected_id) {
            self.selected_id = NodeId::UNSET;
        }
        if !self.hierarchy.has_pending_changes() {
            return;
        }
        let changes = self.hierarchy.take_changes();

        if changes.iter().any(|change| change.node == self.root) {
            self.recompile_node_list();
            let mut hooks = mem::replace(&mut self.hooks, Box::new(()));
            hooks.graph_changed(self, &changes);
            self.hooks = hooks;
        }

        let mut subscriptions = mem::take(&mut self.subscriptions);
        for change in &changes {
            for subscription in subscriptions
                .iter_mut()
                .filter(|subscription| subscription.node == change.node)
            {
                (subscription.listener)(self, *change);
            }
        }
        self.subscriptions = subscriptions;
    }

    pub(crate) fn check_kind(&self, kind: &str) -> Result<()> {
        let registry = self.hierarchy.registry();
        if !registry.contains_node_kind(kind) {
            return Err(Error::UnknownNodeKind(kind.to_string()));
        }
        if !registry.is_assignable(kind, &self.options.base_kind) {
            return Err(Error::KindMismatch {
                kind: kind.to_string(),
                expected: self.options.base_kind.clone(),
            });
        }
        Ok(())
    }

    /// Create a detached node. Attach it with [`Self::set_parent`] or
    /// [`Self::insert_child`].
    pub fn create_node(&mut self, kind: &str) -> Result<NodeId> {
        self.check_kind(kind)?;
        self.hierarchy.create(kind)
    }

    /// Create a node and attach it under `parent`. A refused attach drops
    /// the new node and yields `None`.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        kind: &str,
    ) -> Result<Option<NodeId>> {
        if !self.hierarchy.contains(parent) {
            return Ok(None);
        }
        let child = self.create_node(kind)?;
        if !self.hierarchy.set_parent(child, Some(parent)) {
            self.hierarchy.remove_subtree(child);
            return Ok(None);
        }
        self.commit();
        Ok(Some(child))
    }

    /// Checked re-parent; see [`Hierarchy::set_parent`]. The root never
    /// moves.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> bool {
        if node == self.root {
            return parent.is_none();
        }
        let moved = self.hierarchy.set_parent(node, parent);
        self.commit();
        moved
    }

    /// See [`Hierarchy::insert_child`]. The root never moves.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> bool {
        if child == self.root {
            return false;
        }
        let inserted = self.hierarchy.insert_child(parent, index, child);
        self.commit();
        inserted
    }

    /// Detach `node` and free its subtree. The root and nodes that may not
    /// leave their parent are kept.
    pub fn delete(&mut self, node: NodeId) -> bool {
        if node == self.root || !self.hierarchy.contains(node) {
            return false;
        }
        let attached = self.hierarchy.parent_of(node).is_some();
        if attached && !self.hierarchy.can_set_parent(node, None) {
            log::debug!("rejected deleting locked node {node}");
            return false;
        }
        let removed = self.hierarchy.remove_subtree(node);
        log::trace!("deleted {removed} nodes under {node}");
        self.commit();
        true
    }

    /// Rename a node. Blank names are refused.
    pub fn rename(&mut self, node: NodeId, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        match self.hierarchy.node_mut(node) {
            Some(target) => {
                target.set_name(name);
                true
            }
            None => false,
        }
    }

    /// Deep copy of `node`'s subtree as a detached subtree with fresh ids.
    pub fn duplicate(&mut self, node: NodeId) -> Result<NodeId> {
        duplicator::duplicate(&mut self.hierarchy, node)
    }

    /// Duplicate `node` and append the copy to the original's parent.
    ///
    /// Yields `None` for the root, for parent-locked nodes and when the
    /// parent refuses the copy.
    pub fn duplicate_beside(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        let Some(parent) = self.hierarchy.parent_of(node) else {
            return Ok(None);
        };
        if node == self.root || self.hierarchy.parent_locked(node) {
            return Ok(None);
        }

        let copy = self.duplicate(node)?;
        if !self.hierarchy.set_parent(copy, Some(parent)) {
            self.hierarchy.remove_subtree(copy);
            return Ok(None);
        }
        self.commit();
        Ok(Some(copy))
    }

    /// Export `node`'s subtree using the configured JSON style.
    pub fn save_as_json(&self, node: NodeId) -> Result<String> {
        duplicator::save_as_json(&self.hierarchy, node, self.options.json_style)
    }

    /// Import an exported subtree as a detached subtree with fresh ids. Every
    /// node must derive from the asset's base kind.
    pub fn load_from_json(&mut self, json: &str) -> Result<NodeId> {
        let file = duplicator::parse_subtree(json)?;
        for record in &file.nodes {
            self.check_kind(&record.kind)?;
        }
        duplicator::instantiate_records(&mut self.hierarchy, file.nodes)
    }

    /// Like [`Self::load_from_json`] with the loaded root required to derive
    /// from `kind`.
    pub fn load_from_json_as(
        &mut self,
        json: &str,
        kind: &str,
    ) -> Result<NodeId> {
        let root = self.load_from_json(json)?;
        duplicator::ensure_root_kind(&mut self.hierarchy, root, kind)
    }

    /// Full persisted state: the node list in order plus the selection.
    pub fn snapshot(&self) -> Result<AssetFile> {
        let nodes = self
            .nodes
            .iter()
            .map(|&id| {
                self.hierarchy
                    .node(id)
                    .ok_or(Error::MissingNode(id))
                    .and_then(Node::to_record)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(AssetFile {
            selected_id: self.selected_id,
            nodes,
        })
    }

    /// Replace the whole tree with persisted state and re-enable. Ids are
    /// kept. Records that fail to decode or link leave the current tree
    /// untouched.
    pub fn restore(&mut self, file: AssetFile) -> Result<()> {
        let result = self.restore_nodes(file);
        if let Err(err) = &result {
            log::warn!("failed to restore node asset: {err}");
        }
        result
    }

    fn restore_nodes(&mut self, file: AssetFile) -> Result<()> {
        let registry = self.hierarchy.registry_handle();
        let nodes = file
            .nodes
            .into_iter()
            .map(|record| decode_node(&registry, record))
            .collect::<Result<Vec<_>>>()?;
        for node in &nodes {
            self.check_kind(node.kind())?;
        }
        let links: Vec<(NodeId, NodeId)> =
            nodes.iter().map(|node| (node.id(), node.parent_id())).collect();
        let root = validate_links(&links)?;

        self.hierarchy.clear();
        self.root = links[root].0;
        self.nodes = links.iter().map(|&(id, _)| id).collect();
        for node in nodes {
            self.hierarchy.insert_node(node);
        }
        self.selected_id = file.selected_id;
        self.enable()
    }

    /// O(1) lookup through the node list. Detached nodes are not found.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id)?;
        self.hierarchy.node(id)
    }

    /// Nodes in the tree named `name`, in list order.
    pub fn find_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes().filter(move |node| node.name() == name)
    }

    /// The flattened tree, pre-order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter_map(|&id| self.hierarchy.node(id))
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Position of `id` in the node list.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> Option<&Node> {
        self.hierarchy.node(self.root)
    }

    /// Any node owned by the asset, attached or detached.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.hierarchy.node(id)
    }

    /// Mutable access for renames, locks and component edits.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.hierarchy.node_mut(id)
    }

    pub fn selected_id(&self) -> NodeId {
        self.selected_id
    }

    pub fn set_selected_id(&mut self, id: NodeId) {
        self.selected_id = id;
    }

    /// The selected node, or the root when nothing valid is selected.
    pub fn selected_node(&self) -> Option<&Node> {
        self.find(self.selected_id).or_else(|| self.root_node())
    }

    /// Read access to the tree structure, locks and components.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Component edits and other non-structural changes. Structural calls
    /// made here are announced with the next committed asset edit.
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    pub fn registry(&self) -> &Registry {
        self.hierarchy.registry()
    }

    pub fn options(&self) -> &AssetOptions {
        &self.options
    }

    /// Call `listener` after every committed edit that changed `node`'s
    /// child list, directly or below it.
    pub fn subscribe(
        &mut self,
        node: NodeId,
        listener: impl FnMut(&NodeAsset, ChildrenChanged) + 'static,
    ) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.subscriptions.push(Subscription {
            id,
            node,
            listener: Box::new(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        before != self.subscriptions.len()
    }

    /// Node kinds that may be created in this asset.
    pub fn node_menu(&self) -> Vec<MenuEntry> {
        self.registry().node_menu(&self.options.base_kind)
    }

    /// Whether children may be added under `parent` at all.
    pub fn can_add_children(&self, parent: NodeId) -> bool {
        self.hierarchy.contains(parent)
            && !self.hierarchy.children_locked(parent)
            && !self.hierarchy.hierarchy_locked(parent)
            && !self.hierarchy.is_in_locked_hierarchy(parent)
    }
}

impl fmt::Debug for NodeAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAsset")
            .field("root", &self.root)
            .field("nodes", &self.nodes)
            .field("selected_id", &self.selected_id)
            .field("options", &self.options)
            .field("listeners", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}
