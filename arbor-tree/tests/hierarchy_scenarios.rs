use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use arbor_tree::{
    Component, DropPosition, NodeAsset, NodeId, NodeKind, Registry, duplicator,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Marker {
    note: String,
}

impl Component for Marker {
    const KIND: &'static str = "Marker";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Position {
    x: i64,
    y: i64,
}

impl Component for Position {
    const KIND: &'static str = "Position";
    const TARGET: &'static str = "Placed";
    const SINGLETON: bool = true;
}

fn registry() -> Arc<Registry> {
    let registry = Registry::builder()
        .node(NodeKind::new("Placed").requires::<Position>())
        .component::<Marker>()
        .component::<Position>()
        .build()
        .expect("registry is valid");
    Arc::new(registry)
}

struct Scene {
    asset: NodeAsset,
    root: NodeId,
    a: NodeId,
    b: NodeId,
    c: NodeId,
}

fn scene() -> Scene {
    let mut asset = NodeAsset::builder(registry())
        .build()
        .expect("asset builds");
    let root = asset.root();
    let a = attach(&mut asset, root, "Placed", "A");
    let b = attach(&mut asset, a, "Node", "B");
    let c = attach(&mut asset, a, "Node", "C");
    Scene { asset, root, a, b, c }
}

fn attach(
    asset: &mut NodeAsset,
    parent: NodeId,
    kind: &str,
    name: &str,
) -> NodeId {
    let node = asset
        .create_child(parent, kind)
        .expect("kind is registered")
        .expect("parent accepts children");
    assert!(asset.rename(node, name));
    node
}

fn assert_links_consistent(asset: &NodeAsset) {
    for node in asset.nodes() {
        for &child in node.children() {
            assert_eq!(asset.hierarchy().parent_of(child), Some(node.id()));
        }
    }
}

fn outline(asset: &NodeAsset, start: NodeId) -> Vec<(String, usize)> {
    asset
        .hierarchy()
        .subtree(start)
        .into_iter()
        .filter_map(|id| asset.node(id))
        .map(|node| (node.name().to_string(), node.child_count()))
        .collect()
}

#[test]
fn given_mixed_edits_when_inspecting_then_every_child_points_back_to_parent() {
    let Scene { mut asset, root, a, b, c } = scene();
    let d = attach(&mut asset, c, "Node", "D");

    assert!(asset.set_parent(d, Some(root)));
    assert!(asset.insert_child(d, 0, b));
    assert!(asset.insert_child(root, 0, c));
    assert_eq!(asset.drop_nodes(&[a], DropPosition::Upon(c)), 1);
    assert!(asset.delete(b));

    assert_links_consistent(&asset);
    assert_eq!(asset.node_ids().len(), 4);
    assert_eq!(asset.node_ids()[0], root);
}

#[test]
fn given_descendant_target_when_reparenting_then_tree_is_unchanged() {
    let Scene { mut asset, root, a, b, c } = scene();
    let before = asset.node_ids().to_vec();

    assert!(!asset.set_parent(a, Some(b)));
    assert!(!asset.hierarchy().can_set_parent(a, Some(c)));

    assert_eq!(asset.node_ids(), before.as_slice());
    assert_eq!(asset.hierarchy().parent_of(a), Some(root));
}

#[test]
fn given_duplicate_when_comparing_then_shape_matches_and_ids_are_disjoint() {
    let Scene { mut asset, root, a, .. } = scene();
    let original: HashSet<NodeId> =
        asset.hierarchy().subtree(root).into_iter().collect();

    let copy = asset.duplicate(a).expect("duplicate");

    assert_eq!(outline(&asset, copy), outline(&asset, a));
    assert!(
        asset
            .hierarchy()
            .subtree(copy)
            .iter()
            .all(|id| !original.contains(id))
    );
}

#[test]
fn given_exported_subtree_when_loading_then_names_and_components_survive() {
    let Scene { mut asset, a, b, .. } = scene();
    asset
        .hierarchy_mut()
        .attach_component(b, Marker { note: String::from("keep me") })
        .expect("marker attaches");
    asset
        .hierarchy_mut()
        .edit_component::<Position>(a, |position| {
            position.x = 4;
            position.y = -2;
        });

    let json = asset.save_as_json(a).expect("export");
    let loaded = asset.load_from_json_as(&json, "Placed").expect("import");

    assert_ne!(loaded, a);
    assert_eq!(outline(&asset, loaded), outline(&asset, a));
    assert_eq!(
        asset.hierarchy().get_component::<Position>(loaded),
        Some(&Position { x: 4, y: -2 })
    );
    let loaded_b = asset
        .hierarchy()
        .find_by_name_from(loaded, "B")
        .expect("loaded b");
    assert_ne!(loaded_b, b);
    assert_eq!(
        asset
            .hierarchy()
            .get_component::<Marker>(loaded_b)
            .map(|marker| marker.note.as_str()),
        Some("keep me")
    );
}

#[test]
fn given_exported_subtree_when_loading_through_hierarchy_then_ids_are_fresh() {
    let Scene { mut asset, a, .. } = scene();
    let json =
        duplicator::save_as_json(asset.hierarchy(), a, Default::default())
            .expect("export");

    let loaded = duplicator::load_from_json(asset.hierarchy_mut(), &json)
        .expect("import");

    assert_ne!(loaded, a);
    assert_eq!(asset.hierarchy().child_count(loaded), 2);
}

#[test]
fn given_locked_hierarchy_when_editing_any_depth_then_rejects() {
    let Scene { mut asset, root, a, b, c } = scene();
    let deep = attach(&mut asset, b, "Node", "Deep");
    let loose = asset.create_node("Node").expect("loose node");
    asset.node_mut(a).expect("a").lock_hierarchy();

    assert!(!asset.insert_child(b, 0, loose));
    assert!(!asset.set_parent(loose, Some(c)));
    assert!(!asset.set_parent(deep, Some(root)));
    assert!(!asset.delete(c));

    assert_eq!(asset.hierarchy().child_count(b), 1);
    assert_eq!(asset.node_ids().len(), 5);
}

#[test]
fn given_parent_locked_node_when_reparenting_then_every_target_is_refused() {
    let Scene { mut asset, root, a, b, c } = scene();
    asset.node_mut(c).expect("c").lock_parent();

    for target in [Some(root), Some(b), None] {
        assert!(!asset.set_parent(c, target));
    }
    assert!(!asset.delete(c));
    assert_eq!(asset.hierarchy().parent_of(c), Some(a));
}

#[test]
fn given_recompiled_list_when_counting_then_matches_reachable_nodes() {
    let Scene { mut asset, root, a, .. } = scene();
    let copy = asset.duplicate(a).expect("duplicate");

    asset.recompile_node_list();
    assert_eq!(asset.node_ids().len(), 4);
    assert!(asset.set_parent(copy, Some(root)));

    assert_eq!(asset.node_ids().len(), asset.hierarchy().subtree(root).len());
    assert_eq!(asset.node_ids().len(), 7);
    assert_eq!(asset.node_ids()[0], root);
}

#[test]
fn given_last_child_when_inserted_first_then_order_flips_and_root_hears_once() {
    let Scene { mut asset, root, a, b, c } = scene();
    let heard = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&heard);
    asset.subscribe(root, move |_, _| *counter.borrow_mut() += 1);

    assert!(asset.insert_child(a, 0, c));

    assert_eq!(asset.hierarchy().node(a).expect("a").children(), &[c, b]);
    assert_eq!(*heard.borrow(), 1);
}

#[test]
fn given_children_locked_parent_when_reordering_then_order_flips_once() {
    let Scene { mut asset, root, a, b, c } = scene();
    let heard = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&heard);
    asset.subscribe(root, move |_, _| *counter.borrow_mut() += 1);
    asset.node_mut(a).expect("a").lock_children();

    assert!(asset.insert_child(a, 0, c));

    assert_eq!(asset.hierarchy().node(a).expect("a").children(), &[c, b]);
    assert_eq!(*heard.borrow(), 1);
}

#[test]
fn given_root_when_moving_through_hierarchy_then_links_stay_intact() {
    let Scene { mut asset, root, .. } = scene();
    let loose = asset.create_node("Node").expect("loose");

    assert!(!asset.hierarchy_mut().set_parent(root, Some(loose)));
    asset.enable().expect("enable");

    assert_eq!(asset.hierarchy().parent_of(root), None);
    assert_eq!(asset.hierarchy().child_count(loose), 0);
    assert_links_consistent(&asset);
}

#[test]
fn given_hierarchy_locked_node_when_inserting_child_then_count_is_unchanged() {
    let Scene { mut asset, b, .. } = scene();
    let new_node = asset.create_node("Node").expect("new node");
    asset.node_mut(b).expect("b").lock_hierarchy();

    assert!(!asset.insert_child(b, 0, new_node));

    assert_eq!(asset.hierarchy().child_count(b), 0);
}

#[test]
fn given_duplicated_subtree_when_searching_by_name_then_resolves_inside_copy() {
    let Scene { mut asset, a, b, c, .. } = scene();

    let copy = asset.duplicate(a).expect("duplicate");

    let copied_b = asset
        .hierarchy()
        .find_by_name_from(copy, "B")
        .expect("copy contains B");
    assert_ne!(copy, a);
    assert_ne!(copied_b, b);
    assert!(asset.hierarchy().has_ancestor(copied_b, copy));
    assert_eq!(asset.hierarchy().child_count(copy), 2);
    assert_ne!(asset.hierarchy().child(copy, 1), Some(c));
}
