//! Typed node trees with components, locks and deep copies.
//!
//! The crate keeps an arena of nodes linked into a tree, guards structural
//! edits with a two-axis lock model and layers typed components on top of
//! each node.
//!
//! The main entry points are:
//! - [`Registry`], the static table of node kinds and component kinds built
//!   once at start-up with [`RegistryBuilder`].
//! - [`Hierarchy`], the arena itself: re-parenting, ordered insertion,
//!   ancestor queries, index paths and component composition.
//! - [`NodeAsset`], the owner of one rooted tree and its flattened, pre-order
//!   node list. It commits every edit, keeps the list current and notifies
//!   subscribed listeners.
//!
//! Callers usually:
//! 1. Register their node kinds and [`Component`] types.
//! 2. Build a [`NodeAsset`] (optionally from a template) or load one with
//!    [`load_asset_from`].
//! 3. Drive edits through the asset (`set_parent`, `insert_child`,
//!    `drop_nodes`, `duplicate_beside`, `delete`) and persist it with
//!    [`save_asset_to`] or [`NodeAsset::snapshot`].

mod asset;
mod clipboard;
mod component;
mod composition;
mod error;
mod hierarchy;
mod id;
mod lock;
mod naming;
mod node;
mod options;
mod record;
mod registry;
mod reorder;
mod storage;

pub mod duplicator;

#[cfg(test)]
mod testing;

pub use asset::{AssetBuilder, AssetHooks, ListenerId, NodeAsset};
pub use clipboard::Clipboard;
pub use component::{Component, ComponentSlot, DynComponent};
pub use error::{Error, Result};
pub use hierarchy::{ChildrenChanged, Hierarchy};
pub use id::{ComponentId, NodeId};
pub use lock::{HierarchyLockState, ParentLockState};
pub use naming::humanize;
pub use node::Node;
pub use options::{AssetOptions, JsonStyle};
pub use record::{AssetFile, ComponentRecord, NodeRecord, SubtreeFile};
pub use registry::{
    BASE_NODE_KIND, ChildrenChangedHook, MenuEntry, NodeKind, Registry,
    RegistryBuilder,
};
pub use reorder::{DropPosition, adjusted_insert_index, uppermost};
pub use storage::{load_asset_from, save_asset_to};
