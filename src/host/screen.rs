use serde::{Deserialize, Serialize};

/// Opaque handle the host uses to address a control when clicking it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId(pub String);

impl ControlId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScreenKind {
    AppDetails,
    ConfirmDialog,
    /// Any other window; carries the host's class name for logging.
    Other(String),
}

impl ScreenKind {
    pub fn as_str(&self) -> &str {
        match self {
            ScreenKind::AppDetails => "app-details",
            ScreenKind::ConfirmDialog => "confirm-dialog",
            ScreenKind::Other(name) => name,
        }
    }
}

/// One node of the control tree captured with a screen-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlNode {
    pub id: ControlId,
    pub view_id: Option<String>,
    pub text: Option<String>,
    pub clickable: bool,
    pub enabled: bool,
    #[serde(default)]
    pub children: Vec<ControlNode>,
}

impl ControlNode {
    pub fn container(id: impl Into<String>, children: Vec<ControlNode>) -> Self {
        Self {
            id: ControlId::new(id),
            view_id: None,
            text: None,
            clickable: false,
            enabled: true,
            children,
        }
    }

    pub fn button(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ControlId::new(id),
            view_id: None,
            text: Some(text.into()),
            clickable: true,
            enabled: true,
            children: Vec::new(),
        }
    }

    pub fn with_view_id(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ControlNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn is_clickable(&self) -> bool {
        self.clickable && self.enabled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenNotification {
    pub screen_kind: ScreenKind,
    pub control_snapshot: ControlNode,
}

impl ScreenNotification {
    pub fn new(screen_kind: ScreenKind, control_snapshot: ControlNode) -> Self {
        Self {
            screen_kind,
            control_snapshot,
        }
    }
}
