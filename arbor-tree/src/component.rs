use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::id::{ComponentId, NodeId};
use crate::record::ComponentRecord;
use crate::registry::BASE_NODE_KIND;

/// A typed behavior or data object that can be attached to a node.
///
/// Implementors declare a unique [`Component::KIND`] tag and the node kind
/// they are designed for in [`Component::TARGET`]. A component attaches to a
/// node only when the node's kind derives from `TARGET`.
///
/// ```ignore
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Transform {
///     x: i32,
///     y: i32,
/// }
///
/// impl Component for Transform {
///     const KIND: &'static str = "Transform";
///     const TARGET: &'static str = "Spatial";
///     const SINGLETON: bool = true;
/// }
/// ```
pub trait Component:
    Any + Clone + fmt::Debug + Default + Serialize + DeserializeOwned
{
    /// Tag stored in persisted records.
    const KIND: &'static str;
    /// Node kind this component may attach to (or any kind derived from it).
    const TARGET: &'static str = BASE_NODE_KIND;
    /// At most one instance per node.
    const SINGLETON: bool = false;
    /// Label for "add component" menus. Falls back to the humanized kind.
    const MENU_NAME: Option<&'static str> = None;

    /// Called after the component's data was edited in place.
    fn on_validate(&mut self) {}
}

/// Object-safe view over any [`Component`].
pub trait DynComponent: Any + fmt::Debug {
    fn kind(&self) -> &'static str;
    fn to_value(&self) -> serde_json::Result<serde_json::Value>;
    fn clone_box(&self) -> Box<dyn DynComponent>;
    fn validate(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> DynComponent for C {
    fn kind(&self) -> &'static str {
        C::KIND
    }

    fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn clone_box(&self) -> Box<dyn DynComponent> {
        Box::new(self.clone())
    }

    fn validate(&mut self) {
        self.on_validate();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn DynComponent {
    pub fn is<C: Component>(&self) -> bool {
        self.as_any().is::<C>()
    }

    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut::<C>()
    }
}

/// A component instance in a node's component list.
#[derive(Debug)]
pub struct ComponentSlot {
    id: ComponentId,
    owner: NodeId,
    required: bool,
    component: Box<dyn DynComponent>,
}

impl ComponentSlot {
    pub(crate) fn new(
        owner: NodeId,
        component: Box<dyn DynComponent>,
        required: bool,
    ) -> Self {
        Self {
            id: ComponentId::generate(),
            owner,
            required,
            component,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Node this component is attached to.
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Added to satisfy a requirement of the owner's kind; cannot be removed.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> &'static str {
        self.component.kind()
    }

    pub fn component(&self) -> &dyn DynComponent {
        self.component.as_ref()
    }

    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.component().downcast_ref::<C>()
    }

    pub(crate) fn component_mut(&mut self) -> &mut dyn DynComponent {
        self.component.as_mut()
    }

    /// Hand the slot to a new owner under a fresh handle.
    pub(crate) fn rebind(&mut self, owner: NodeId) {
        self.id = ComponentId::generate();
        self.owner = owner;
    }

    pub(crate) fn to_record(&self) -> Result<ComponentRecord> {
        Ok(ComponentRecord {
            kind: self.kind().to_string(),
            required: self.required,
            data: self.component.to_value()?,
        })
    }
}

impl Clone for ComponentSlot {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            owner: self.owner,
            required: self.required,
            component: self.component.clone_box(),
        }
    }
}
