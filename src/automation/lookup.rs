use serde::{Deserialize, Serialize};

use crate::host::ControlNode;

/// One way of finding a control in a snapshot. Identifiers and labels differ
/// across host versions and locales, so callers try a chain of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "by", content = "value")]
pub enum ControlLookup {
    /// Case-insensitive substring match on the visible label.
    Text(String),
    /// Exact match on the stable view identifier.
    ViewId(String),
}

impl ControlLookup {
    pub fn matches(&self, node: &ControlNode) -> bool {
        match self {
            ControlLookup::Text(label) => node
                .text
                .as_deref()
                .map(|text| text.to_lowercase().contains(&label.to_lowercase()))
                .unwrap_or(false),
            ControlLookup::ViewId(id) => node.view_id.as_deref() == Some(id.as_str()),
        }
    }

    pub fn find_all<'a>(&self, root: &'a ControlNode) -> Vec<&'a ControlNode> {
        let mut found = Vec::new();
        root.walk(&mut |node| {
            if self.matches(node) {
                found.push(node);
            }
        });
        found
    }
}

/// Runs the chain in order and returns the matches of the first strategy that
/// finds anything.
pub fn locate<'a>(chain: &[ControlLookup], root: &'a ControlNode) -> Option<Vec<&'a ControlNode>> {
    chain
        .iter()
        .map(|lookup| lookup.find_all(root))
        .find(|found| !found.is_empty())
}
