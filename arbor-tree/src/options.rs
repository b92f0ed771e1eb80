use serde::Serialize;

use crate::registry::BASE_NODE_KIND;

/// Layout of JSON produced for export and storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JsonStyle {
    #[default]
    Compact,
    Pretty,
}

impl JsonStyle {
    pub(crate) fn render<T: Serialize>(
        self,
        value: &T,
    ) -> serde_json::Result<String> {
        match self {
            JsonStyle::Compact => serde_json::to_string(value),
            JsonStyle::Pretty => serde_json::to_string_pretty(value),
        }
    }
}

/// Configuration knobs for a node asset.
#[derive(Clone, Debug)]
pub struct AssetOptions {
    /// Kind every node in the asset must derive from. The root is created
    /// with this kind.
    pub base_kind: String,
    /// Name given to a freshly built root.
    pub root_name: String,
    pub json_style: JsonStyle,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            base_kind: BASE_NODE_KIND.to_string(),
            root_name: String::from("Root"),
            json_style: JsonStyle::Compact,
        }
    }
}
