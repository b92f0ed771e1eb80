//! Shared fixtures for unit tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset::NodeAsset;
use crate::component::Component;
use crate::id::NodeId;
use crate::node::Node;
use crate::registry::{NodeKind, Registry};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Label {
    pub(crate) text: String,
}

impl Label {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl Component for Label {
    const KIND: &'static str = "Label";
    const MENU_NAME: Option<&'static str> = Some("Text Label");

    fn on_validate(&mut self) {
        self.text = self.text.trim().to_string();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Transform {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl Component for Transform {
    const KIND: &'static str = "Transform";
    const TARGET: &'static str = "Spatial";
    const SINGLETON: bool = true;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Light {
    pub(crate) intensity: u32,
}

impl Component for Light {
    const KIND: &'static str = "Light";
    const TARGET: &'static str = "Lamp";
}

fn retitle_folder(node: &mut Node) {
    let title = format!("Folder ({})", node.child_count());
    node.set_name(&title);
}

/// Spatial (requires Transform), Lamp (a Spatial requiring Light), Folder
/// (renames itself after its child count) and Plain (requires a component
/// it cannot hold).
pub(crate) fn registry() -> Arc<Registry> {
    let registry = Registry::builder()
        .node(NodeKind::new("Spatial").requires::<Transform>())
        .node(
            NodeKind::new("Lamp")
                .base("Spatial")
                .menu("Lights/Lamp")
                .requires::<Light>(),
        )
        .node(NodeKind::new("Folder").on_children_changed(retitle_folder))
        .node(NodeKind::new("Plain").requires::<Light>())
        .component::<Label>()
        .component::<Transform>()
        .component::<Light>()
        .build()
        .expect("fixture registry is valid");
    Arc::new(registry)
}

pub(crate) fn asset() -> NodeAsset {
    NodeAsset::builder(registry())
        .build()
        .expect("fixture asset builds")
}

/// `Root -> A -> {B, C}`, all plain nodes. Returns the asset and A, B, C.
pub(crate) fn abc() -> (NodeAsset, NodeId, NodeId, NodeId) {
    let mut asset = asset();
    let root = asset.root();
    let a = child(&mut asset, root, "A");
    let b = child(&mut asset, a, "B");
    let c = child(&mut asset, a, "C");
    (asset, a, b, c)
}

fn child(asset: &mut NodeAsset, parent: NodeId, name: &str) -> NodeId {
    let node = asset
        .create_child(parent, "Node")
        .expect("fixture node kind is valid")
        .expect("fixture parent accepts children");
    asset.rename(node, name);
    node
}
