//! Traits for the host services the freezer drives but does not own: the
//! automation surface (notifications in, synthetic actions out) and the
//! installed-application inventory.

pub mod screen;

use std::time::Duration;

use anyhow::Result;

use crate::automation::NotificationSink;
use crate::models::{Application, UsageSample};

pub use screen::{ControlId, ControlNode, ScreenKind, ScreenNotification};

/// Delivers foreground screen changes from the host automation surface.
pub trait NotificationBridge: Send + Sync {
    /// Called once for the lifetime of the automating process.
    fn register(&self, sink: NotificationSink) -> Result<()>;
}

/// Synthetic input on the host automation surface.
pub trait ActionDispatcher: Send + Sync {
    /// Returns false when the control is gone or refuses the click.
    fn dispatch_click(&self, control: &ControlId) -> bool;

    fn navigate_back(&self);

    /// Opens the system management screen for `application_id`.
    fn request_management_screen(&self, application_id: &str) -> Result<()>;
}

pub trait InventorySource: Send + Sync {
    fn list_applications(&self) -> Result<Vec<Application>>;

    /// Usage aggregated over the trailing `window`. `None` when the host has
    /// no record of the application in that window.
    fn usage_sample(&self, application_id: &str, window: Duration) -> Option<UsageSample>;

    /// False on hosts that cannot report usage at all.
    fn usage_stats_available(&self) -> bool;

    fn launcher_id(&self) -> Option<String> {
        None
    }
}
