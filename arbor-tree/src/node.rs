use crate::component::{Component, ComponentSlot};
use crate::error::Result;
use crate::id::NodeId;
use crate::lock::{HierarchyLockState, ParentLockState};
use crate::naming::humanize;
use crate::record::NodeRecord;

/// One vertex of a hierarchy.
///
/// A node owns its name, lock state and component list. Parent and child
/// links are maintained by [`crate::Hierarchy`] and are read-only here.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    pub(crate) parent_id: NodeId,
    kind: String,
    name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    hierarchy_lock: HierarchyLockState,
    parent_lock: ParentLockState,
    pub(crate) components: Vec<ComponentSlot>,
}

impl Node {
    /// Fresh detached node named after its kind.
    pub(crate) fn new(id: NodeId, kind: &str) -> Self {
        Self {
            id,
            parent_id: NodeId::UNSET,
            kind: kind.to_string(),
            name: humanize(kind),
            parent: None,
            children: Vec::new(),
            hierarchy_lock: HierarchyLockState::None,
            parent_lock: ParentLockState::Auto,
            components: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        id: NodeId,
        parent_id: NodeId,
        kind: String,
        name: &str,
        hierarchy_lock: HierarchyLockState,
        parent_lock: ParentLockState,
        components: Vec<ComponentSlot>,
    ) -> Self {
        let name = if name.trim().is_empty() {
            humanize(&kind)
        } else {
            name.trim().to_string()
        };
        Self {
            id,
            parent_id,
            kind,
            name,
            parent: None,
            children: Vec::new(),
            hierarchy_lock,
            parent_lock,
            components,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Persisted parent reference. Only authoritative while rebuilding.
    pub fn parent_id(&self) -> NodeId {
        self.parent_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name; surrounding whitespace is trimmed.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.trim().to_string();
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    pub fn index_of(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&id| id == child)
    }

    pub fn hierarchy_lock(&self) -> HierarchyLockState {
        self.hierarchy_lock
    }

    pub fn parent_lock(&self) -> ParentLockState {
        self.parent_lock
    }

    pub fn is_children_locked(&self) -> bool {
        self.hierarchy_lock == HierarchyLockState::ChildrenLocked
    }

    pub fn is_hierarchy_locked(&self) -> bool {
        self.hierarchy_lock == HierarchyLockState::HierarchyLocked
    }

    pub fn set_hierarchy_lock(
        &mut self,
        state: HierarchyLockState,
    ) -> HierarchyLockState {
        self.hierarchy_lock = state;
        self.hierarchy_lock
    }

    pub fn set_parent_lock(
        &mut self,
        state: ParentLockState,
    ) -> ParentLockState {
        self.parent_lock = state;
        self.parent_lock
    }

    pub fn unlock_hierarchy(&mut self) -> HierarchyLockState {
        self.set_hierarchy_lock(HierarchyLockState::None)
    }

    pub fn lock_children(&mut self) -> HierarchyLockState {
        self.set_hierarchy_lock(HierarchyLockState::ChildrenLocked)
    }

    pub fn lock_hierarchy(&mut self) -> HierarchyLockState {
        self.set_hierarchy_lock(HierarchyLockState::HierarchyLocked)
    }

    /// The node may still be pinned by its parent or an ancestor.
    pub fn unlock_parent(&mut self) -> ParentLockState {
        self.set_parent_lock(ParentLockState::Auto)
    }

    pub fn lock_parent(&mut self) -> ParentLockState {
        self.set_parent_lock(ParentLockState::Locked)
    }

    pub fn components(&self) -> &[ComponentSlot] {
        &self.components
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, index: usize) -> Option<&ComponentSlot> {
        self.components.get(index)
    }

    /// First component whose kind tag matches.
    pub fn component_of_kind(&self, kind: &str) -> Option<&ComponentSlot> {
        self.components.iter().find(|slot| slot.kind() == kind)
    }

    /// First component of exactly type `C`.
    pub fn get_component<C: Component>(&self) -> Option<&C> {
        self.components.iter().find_map(ComponentSlot::downcast_ref::<C>)
    }

    pub fn has_component<C: Component>(&self) -> bool {
        self.get_component::<C>().is_some()
    }

    pub fn has_component_kind(&self, kind: &str) -> bool {
        self.component_of_kind(kind).is_some()
    }

    /// Whether a required component of `kind` is attached.
    pub fn requires_component(&self, kind: &str) -> bool {
        self.components
            .iter()
            .any(|slot| slot.is_required() && slot.kind() == kind)
    }

    /// Copy with the live links stripped, ready to be flattened.
    pub(crate) fn detached_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.parent = None;
        copy.children.clear();
        copy
    }

    /// Adopt a new identity and links. Components move to fresh handles.
    pub(crate) fn relink(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        children: Vec<NodeId>,
    ) {
        self.id = id;
        self.parent = parent;
        self.parent_id = parent.unwrap_or(NodeId::UNSET);
        self.children = children;
        for slot in &mut self.components {
            slot.rebind(id);
        }
    }

    pub(crate) fn to_record(&self) -> Result<NodeRecord> {
        let components = self
            .components
            .iter()
            .map(ComponentSlot::to_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(NodeRecord {
            id: self.id,
            parent_id: self.parent_id,
            kind: self.kind.clone(),
            name: self.name.clone(),
            hierarchy_lock: self.hierarchy_lock,
            parent_lock: self.parent_lock,
            components,
        })
    }
}
