use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a node.
///
/// `0` is reserved for "unset"; generated ids are never zero.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub const UNSET: Self = Self(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn generate() -> Self {
        Self(random_nonzero())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime handle of a component attached to a node. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn generate() -> Self {
        Self(random_nonzero())
    }
}

fn random_nonzero() -> u64 {
    loop {
        let (high, low) = Uuid::new_v4().as_u64_pair();
        let raw = high ^ low;
        if raw != 0 {
            return raw;
        }
    }
}
