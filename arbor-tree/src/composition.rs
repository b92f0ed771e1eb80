use crate::component::{Component, ComponentSlot, DynComponent};
use crate::error::{Error, Result};
use crate::hierarchy::Hierarchy;
use crate::id::{ComponentId, NodeId};
use crate::registry::MenuEntry;

impl Hierarchy {
    /// Attach an instance of every required component of the node's kind
    /// that is compatible with it and not yet present as required.
    pub(crate) fn add_required_components(&mut self, id: NodeId) {
        let registry = self.registry_handle();
        let Some(kind) = self.node(id).map(|node| node.kind().to_string())
        else {
            return;
        };

        for required in registry.required_components(&kind) {
            if !registry.is_component_compatible(required, &kind) {
                log::warn!(
                    "skipping required component `{required}` incompatible \
                     with node kind `{kind}`"
                );
                continue;
            }
            let Some(info) = registry.component_kind(required) else {
                continue;
            };
            let Some(node) = self.node_mut(id) else {
                return;
            };
            if node.requires_component(required) {
                continue;
            }
            node.components
                .push(ComponentSlot::new(id, (info.create)(), true));
        }
    }

    /// Add a default instance of the component kind tagged `kind`.
    ///
    /// Returns `None` when the kind is unknown or incompatible with the node,
    /// or when it is a singleton already present.
    pub fn add_component_kind(
        &mut self,
        id: NodeId,
        kind: &str,
    ) -> Option<ComponentId> {
        let info = *self.registry().component_kind(kind)?;
        self.push_component(id, (info.create)())
    }

    pub fn add_component<C: Component>(
        &mut self,
        id: NodeId,
    ) -> Option<ComponentId> {
        self.attach_component(id, C::default())
    }

    /// Attach an existing instance under the same rules as
    /// [`Self::add_component_kind`]. `C` must be registered.
    pub fn attach_component<C: Component>(
        &mut self,
        id: NodeId,
        component: C,
    ) -> Option<ComponentId> {
        self.registry().component_kind_of::<C>()?;
        self.push_component(id, Box::new(component))
    }

    fn push_component(
        &mut self,
        id: NodeId,
        component: Box<dyn DynComponent>,
    ) -> Option<ComponentId> {
        let kind = component.kind();
        let node_kind = self.node(id)?.kind().to_string();
        if !self.registry().is_component_compatible(kind, &node_kind) {
            log::debug!(
                "component `{kind}` cannot attach to node kind `{node_kind}`"
            );
            return None;
        }
        let singleton = self.registry().is_singleton(kind);

        let node = self.node_mut(id)?;
        if singleton && node.has_component_kind(kind) {
            log::debug!("node {id} already holds singleton component `{kind}`");
            return None;
        }
        let slot = ComponentSlot::new(id, component, false);
        let handle = slot.id();
        node.components.push(slot);
        Some(handle)
    }

    /// Remove one component by handle. Required components stay.
    pub fn remove_component(
        &mut self,
        id: NodeId,
        component: ComponentId,
    ) -> bool {
        let Some(index) = self.node(id).and_then(|node| {
            node.components()
                .iter()
                .position(|slot| slot.id() == component)
        }) else {
            return false;
        };
        self.remove_component_at(id, index)
    }

    pub fn remove_component_at(&mut self, id: NodeId, index: usize) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let Some(slot) = node.components.get(index) else {
            return false;
        };
        if slot.is_required() {
            log::debug!(
                "refusing to remove required component `{}`",
                slot.kind()
            );
            return false;
        }
        node.components.remove(index);
        true
    }

    /// Remove every non-required component tagged `kind`; returns how many
    /// went.
    pub fn remove_components_of_kind(
        &mut self,
        id: NodeId,
        kind: &str,
    ) -> usize {
        let Some(node) = self.node_mut(id) else {
            return 0;
        };
        let before = node.components.len();
        node.components
            .retain(|slot| slot.is_required() || slot.kind() != kind);
        before - node.components.len()
    }

    pub fn remove_components<C: Component>(&mut self, id: NodeId) -> usize {
        self.remove_components_of_kind(id, C::KIND)
    }

    /// Edit the first `C` in place, then run its validate hook.
    pub fn edit_component<C: Component>(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut C),
    ) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let Some(slot) = node
            .components
            .iter_mut()
            .find(|slot| slot.component().is::<C>())
        else {
            return false;
        };
        let component = slot.component_mut();
        if let Some(typed) = component.downcast_mut::<C>() {
            edit(typed);
        }
        component.validate();
        true
    }

    pub fn edit_component_at(
        &mut self,
        id: NodeId,
        index: usize,
        edit: impl FnOnce(&mut dyn DynComponent),
    ) -> bool {
        let Some(slot) = self
            .node_mut(id)
            .and_then(|node| node.components.get_mut(index))
        else {
            return false;
        };
        let component = slot.component_mut();
        edit(&mut *component);
        component.validate();
        true
    }

    pub fn get_component<C: Component>(&self, id: NodeId) -> Option<&C> {
        self.node(id)?.get_component::<C>()
    }

    pub fn try_get_component<C: Component>(&self, id: NodeId) -> Result<&C> {
        self.node(id)
            .ok_or(Error::MissingNode(id))?
            .get_component::<C>()
            .ok_or(Error::MissingComponent(C::KIND))
    }

    /// Component kinds that could still be added to the node.
    pub fn available_components(&self, id: NodeId) -> Vec<MenuEntry> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        self.registry()
            .component_menu(node.kind())
            .into_iter()
            .filter(|entry| {
                !(self.registry().is_singleton(&entry.kind)
                    && node.has_component_kind(&entry.kind))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Label, Light, Transform, registry};

    fn hierarchy() -> Hierarchy {
        Hierarchy::new(registry())
    }

    #[test]
    fn given_derived_kind_when_created_then_inherited_requirements_are_attached()
    {
        let mut hierarchy = hierarchy();

        let lamp = hierarchy.create("Lamp").expect("lamp");

        let node = hierarchy.node(lamp).expect("lamp exists");
        let kinds: Vec<&str> =
            node.components().iter().map(|slot| slot.kind()).collect();
        assert_eq!(kinds, vec![Light::KIND, Transform::KIND]);
        assert!(node.components().iter().all(|slot| slot.is_required()));
        assert!(node.requires_component(Transform::KIND));
    }

    #[test]
    fn given_incompatible_requirement_when_created_then_it_is_skipped() {
        let mut hierarchy = hierarchy();

        let plain = hierarchy.create("Plain").expect("plain");

        assert_eq!(hierarchy.node(plain).expect("plain").component_count(), 0);
    }

    #[test]
    fn given_singleton_present_when_adding_again_then_returns_none() {
        let mut hierarchy = hierarchy();
        let spatial = hierarchy.create("Spatial").expect("spatial");

        assert!(hierarchy.add_component::<Transform>(spatial).is_none());
        assert!(hierarchy.add_component::<Label>(spatial).is_some());
        assert!(hierarchy.add_component::<Label>(spatial).is_some());
        let node = hierarchy.node(spatial).expect("spatial");
        assert_eq!(node.component_count(), 3);
    }

    #[test]
    fn given_incompatible_node_when_adding_then_returns_none() {
        let mut hierarchy = hierarchy();
        let plain = hierarchy.create("Node").expect("node");

        assert!(hierarchy.add_component::<Transform>(plain).is_none());
        assert!(hierarchy.add_component_kind(plain, "Light").is_none());
        assert!(hierarchy.add_component_kind(plain, "Missing").is_none());
    }

    #[test]
    fn given_required_component_when_removing_then_refuses() {
        let mut hierarchy = hierarchy();
        let spatial = hierarchy.create("Spatial").expect("spatial");
        let label = hierarchy
            .attach_component(spatial, Label::new("name"))
            .expect("label attaches");

        assert!(!hierarchy.remove_component_at(spatial, 0));
        assert_eq!(hierarchy.remove_components::<Transform>(spatial), 0);
        assert!(hierarchy.remove_component(spatial, label));
        assert!(!hierarchy.remove_component(spatial, label));
        assert!(hierarchy.get_component::<Transform>(spatial).is_some());
    }

    #[test]
    fn given_many_labels_when_removing_by_kind_then_all_go() {
        let mut hierarchy = hierarchy();
        let node = hierarchy.create("Node").expect("node");
        hierarchy.attach_component(node, Label::new("one"));
        hierarchy.attach_component(node, Label::new("two"));

        assert_eq!(hierarchy.remove_components_of_kind(node, Label::KIND), 2);
        assert!(!hierarchy.node(node).expect("node").has_component::<Label>());
    }

    #[test]
    fn given_component_edit_when_applied_then_validate_hook_runs() {
        let mut hierarchy = hierarchy();
        let node = hierarchy.create("Node").expect("node");
        hierarchy.attach_component(node, Label::new("old"));

        assert!(hierarchy.edit_component::<Label>(node, |label| {
            label.text = String::from("  padded  ");
        }));

        assert_eq!(
            hierarchy
                .get_component::<Label>(node)
                .map(|label| label.text.as_str()),
            Some("padded")
        );
        assert!(!hierarchy.edit_component::<Transform>(node, |_| {}));
    }

    #[test]
    fn given_index_edit_when_applied_then_reaches_dynamic_component() {
        let mut hierarchy = hierarchy();
        let spatial = hierarchy.create("Spatial").expect("spatial");

        assert!(hierarchy.edit_component_at(spatial, 0, |component| {
            if let Some(transform) = component.downcast_mut::<Transform>() {
                transform.x = 12;
            }
        }));

        assert_eq!(
            hierarchy.get_component::<Transform>(spatial),
            Some(&Transform { x: 12, y: 0 })
        );
        assert!(!hierarchy.edit_component_at(spatial, 4, |_| {}));
    }

    #[test]
    fn given_missing_component_when_trying_then_names_it() {
        let mut hierarchy = hierarchy();
        let node = hierarchy.create("Node").expect("node");

        assert!(matches!(
            hierarchy.try_get_component::<Label>(node),
            Err(Error::MissingComponent("Label"))
        ));
        assert!(matches!(
            hierarchy.try_get_component::<Label>(NodeId::from_raw(1)),
            Err(Error::MissingNode(_))
        ));
    }

    #[test]
    fn given_singleton_present_when_listing_available_then_it_is_hidden() {
        let mut hierarchy = hierarchy();
        let spatial = hierarchy.create("Spatial").expect("spatial");

        let available: Vec<String> = hierarchy
            .available_components(spatial)
            .into_iter()
            .map(|entry| entry.kind)
            .collect();

        assert_eq!(available, vec![String::from("Label")]);
    }
}
