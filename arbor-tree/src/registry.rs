use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::component::{Component, DynComponent};
use crate::error::{Error, Result};
use crate::naming::humanize;
use crate::node::Node;

/// Kind every other node kind ultimately derives from.
pub const BASE_NODE_KIND: &str = "Node";

/// Runs on a node when its child list changed, before listeners are told.
pub type ChildrenChangedHook = fn(&mut Node);

type CreateFn = fn() -> Box<dyn DynComponent>;
type DecodeFn =
    fn(serde_json::Value) -> serde_json::Result<Box<dyn DynComponent>>;

/// Declaration of a node kind.
#[derive(Clone)]
pub struct NodeKind {
    name: String,
    base: Option<String>,
    menu_name: Option<String>,
    required: Vec<String>,
    on_children_changed: Option<ChildrenChangedHook>,
}

impl NodeKind {
    /// Declare a kind deriving directly from [`BASE_NODE_KIND`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: Some(BASE_NODE_KIND.to_string()),
            menu_name: None,
            required: Vec::new(),
            on_children_changed: None,
        }
    }

    /// Derive from another registered kind.
    #[must_use]
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Label (or `/`-separated path) shown in "create node" menus.
    #[must_use]
    pub fn menu(mut self, menu_name: impl Into<String>) -> Self {
        self.menu_name = Some(menu_name.into());
        self
    }

    /// Every node of this kind gets a required `C` at construction.
    #[must_use]
    pub fn requires<C: Component>(self) -> Self {
        self.requires_kind(C::KIND)
    }

    #[must_use]
    pub fn requires_kind(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if !self.required.contains(&kind) {
            self.required.push(kind);
        }
        self
    }

    #[must_use]
    pub fn on_children_changed(mut self, hook: ChildrenChangedHook) -> Self {
        self.on_children_changed = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_kind(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn menu_name(&self) -> Option<&str> {
        self.menu_name.as_deref()
    }

    /// Component kinds declared by this kind alone, bases excluded.
    pub fn required_kinds(&self) -> &[String] {
        &self.required
    }

    pub fn children_changed_hook(&self) -> Option<ChildrenChangedHook> {
        self.on_children_changed
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKind")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("menu_name", &self.menu_name)
            .field("required", &self.required)
            .field("has_hook", &self.on_children_changed.is_some())
            .finish()
    }
}

/// Registered component type.
#[derive(Clone, Copy)]
pub(crate) struct ComponentKind {
    pub(crate) name: &'static str,
    pub(crate) target: &'static str,
    pub(crate) singleton: bool,
    pub(crate) menu_name: Option<&'static str>,
    pub(crate) type_id: TypeId,
    pub(crate) create: CreateFn,
    pub(crate) decode: DecodeFn,
}

impl ComponentKind {
    fn of<C: Component>() -> Self {
        Self {
            name: C::KIND,
            target: C::TARGET,
            singleton: C::SINGLETON,
            menu_name: C::MENU_NAME,
            type_id: TypeId::of::<C>(),
            create: create_component::<C>,
            decode: decode_component::<C>,
        }
    }
}

fn create_component<C: Component>() -> Box<dyn DynComponent> {
    Box::new(C::default())
}

fn decode_component<C: Component>(
    value: serde_json::Value,
) -> serde_json::Result<Box<dyn DynComponent>> {
    if value.is_null() {
        return Ok(Box::new(C::default()));
    }
    let component: C = serde_json::from_value(value)?;
    Ok(Box::new(component))
}

/// One row of a "create node" or "add component" menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub kind: String,
    pub label: String,
}

/// Static table of node and component kinds.
///
/// Built once through [`RegistryBuilder`]. All kind relationships
/// (assignability, compatibility, required sets) are answered from here.
pub struct Registry {
    node_kinds: HashMap<String, NodeKind>,
    node_order: Vec<String>,
    component_kinds: HashMap<&'static str, ComponentKind>,
    component_order: Vec<&'static str>,
    type_ids: HashMap<TypeId, &'static str>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn node_kind(&self, kind: &str) -> Option<&NodeKind> {
        self.node_kinds.get(kind)
    }

    pub fn contains_node_kind(&self, kind: &str) -> bool {
        self.node_kinds.contains_key(kind)
    }

    pub fn contains_component_kind(&self, kind: &str) -> bool {
        self.component_kinds.contains_key(kind)
    }

    pub(crate) fn component_kind(&self, kind: &str) -> Option<&ComponentKind> {
        self.component_kinds.get(kind)
    }

    /// Kind tag under which `C` was registered.
    pub(crate) fn component_kind_of<C: Component>(
        &self,
    ) -> Option<&ComponentKind> {
        self.type_ids
            .get(&TypeId::of::<C>())
            .and_then(|kind| self.component_kinds.get(kind))
    }

    /// Whether `kind` is `target` or derives from it.
    pub fn is_assignable(&self, kind: &str, target: &str) -> bool {
        let mut current = Some(kind);
        while let Some(name) = current {
            if name == target {
                return true;
            }
            current = self.node_kinds.get(name).and_then(NodeKind::base_kind);
        }
        false
    }

    /// Whether a component of kind `component` may attach to a node of kind
    /// `node_kind`.
    pub fn is_component_compatible(
        &self,
        component: &str,
        node_kind: &str,
    ) -> bool {
        self.component_kinds
            .get(component)
            .is_some_and(|info| self.is_assignable(node_kind, info.target))
    }

    pub fn is_singleton(&self, component: &str) -> bool {
        self.component_kinds
            .get(component)
            .is_some_and(|info| info.singleton)
    }

    /// Required component kinds of `kind`, its own first, then each base's.
    pub fn required_components(&self, kind: &str) -> Vec<&str> {
        let mut required: Vec<&str> = Vec::new();
        let mut current = self.node_kinds.get(kind);
        while let Some(node_kind) = current {
            for component in &node_kind.required {
                if !required.contains(&component.as_str()) {
                    required.push(component);
                }
            }
            current = node_kind
                .base_kind()
                .and_then(|base| self.node_kinds.get(base));
        }
        required
    }

    /// Node kinds deriving from `base`, in registration order.
    pub fn node_menu(&self, base: &str) -> Vec<MenuEntry> {
        self.node_order
            .iter()
            .filter(|kind| self.is_assignable(kind, base))
            .filter_map(|kind| self.node_kinds.get(kind))
            .map(|node_kind| MenuEntry {
                kind: node_kind.name.clone(),
                label: node_kind
                    .menu_name
                    .clone()
                    .unwrap_or_else(|| humanize(&node_kind.name)),
            })
            .collect()
    }

    /// Component kinds that may attach to `node_kind`, in registration order.
    pub fn component_menu(&self, node_kind: &str) -> Vec<MenuEntry> {
        self.component_order
            .iter()
            .filter_map(|kind| self.component_kinds.get(kind))
            .filter(|info| self.is_assignable(node_kind, info.target))
            .map(|info| MenuEntry {
                kind: info.name.to_string(),
                label: info
                    .menu_name
                    .map(str::to_string)
                    .unwrap_or_else(|| humanize(info.name)),
            })
            .collect()
    }
}

impl Default for Registry {
    /// Registry knowing only [`BASE_NODE_KIND`].
    fn default() -> Self {
        let base = base_node_kind();
        let mut node_kinds = HashMap::new();
        node_kinds.insert(base.name.clone(), base);
        Self {
            node_kinds,
            node_order: vec![BASE_NODE_KIND.to_string()],
            component_kinds: HashMap::new(),
            component_order: Vec::new(),
            type_ids: HashMap::new(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("node_kinds", &self.node_order)
            .field("component_kinds", &self.component_order)
            .finish()
    }
}

fn base_node_kind() -> NodeKind {
    NodeKind {
        name: BASE_NODE_KIND.to_string(),
        base: None,
        menu_name: Some(BASE_NODE_KIND.to_string()),
        required: Vec::new(),
        on_children_changed: None,
    }
}

/// Collects kind declarations; all validation happens in [`Self::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    nodes: Vec<NodeKind>,
    components: Vec<ComponentKind>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn node(mut self, kind: NodeKind) -> Self {
        self.nodes.push(kind);
        self
    }

    #[must_use]
    pub fn component<C: Component>(mut self) -> Self {
        self.components.push(ComponentKind::of::<C>());
        self
    }

    /// Validate every declaration and freeze the registry.
    pub fn build(self) -> Result<Registry> {
        let mut registry = Registry::default();

        for kind in self.nodes {
            if registry.node_kinds.contains_key(&kind.name) {
                return Err(Error::DuplicateNodeKind(kind.name));
            }
            registry.node_order.push(kind.name.clone());
            registry.node_kinds.insert(kind.name.clone(), kind);
        }

        for info in self.components {
            if registry.component_kinds.contains_key(info.name) {
                let name = info.name.to_string();
                return Err(Error::DuplicateComponentKind(name));
            }
            registry.component_order.push(info.name);
            registry.type_ids.insert(info.type_id, info.name);
            registry.component_kinds.insert(info.name, info);
        }

        for name in &registry.node_order {
            check_base_chain(&registry.node_kinds, name)?;
            let kind = &registry.node_kinds[name];
            let known = &registry.component_kinds;
            if let Some(missing) = kind
                .required
                .iter()
                .find(|component| !known.contains_key(component.as_str()))
            {
                return Err(Error::UnknownComponentKind(missing.clone()));
            }
        }

        for kind in &registry.component_order {
            let target = registry.component_kinds[kind].target;
            if !registry.node_kinds.contains_key(target) {
                return Err(Error::UnknownNodeKind(target.to_string()));
            }
        }

        log::debug!(
            "registry built with {} node kinds and {} component kinds",
            registry.node_order.len(),
            registry.component_order.len()
        );
        Ok(registry)
    }
}

fn check_base_chain(
    kinds: &HashMap<String, NodeKind>,
    name: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut current = name;
    loop {
        if !seen.insert(current) {
            return Err(Error::CyclicKindBase(name.to_string()));
        }
        let Some(kind) = kinds.get(current) else {
            return Err(Error::UnknownNodeKind(current.to_string()));
        };
        match kind.base_kind() {
            Some(base) => current = base,
            None => return Ok(()),
        }
    }
}
