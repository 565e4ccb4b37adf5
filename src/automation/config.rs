use std::time::Duration;

use crate::settings::AutomationSettings;

use super::ControlLookup;

pub const FORCE_STOP_LABEL: &str = "FORCE STOP";
pub const CONFIRM_LABEL: &str = "OK";

/// Timeouts and control lookup chains for one freeze attempt. The values were
/// tuned by hand against a handful of host versions; treat them as defaults.
#[derive(Debug, Clone)]
pub struct AutomationConfig {
    /// How long to wait for the next screen after dispatching an action.
    pub action_timeout: Duration,

    /// How long an unexpected screen is tolerated before the attempt is abandoned.
    pub stale_screen_window: Duration,

    pub force_stop: Vec<ControlLookup>,

    pub confirm: Vec<ControlLookup>,

    /// Log every notification, not just transitions.
    pub verbose: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(4),
            stale_screen_window: Duration::from_secs(8),
            force_stop: vec![
                ControlLookup::Text(FORCE_STOP_LABEL.into()),
                ControlLookup::ViewId("com.android.settings:id/right_button".into()),
                ControlLookup::ViewId("com.android.settings:id/force_stop_button".into()),
            ],
            // Some host versions label the confirm button like the force-stop one.
            confirm: vec![
                ControlLookup::Text(CONFIRM_LABEL.into()),
                ControlLookup::Text(FORCE_STOP_LABEL.into()),
            ],
            verbose: debug_from_env(),
        }
    }
}

impl AutomationConfig {
    pub fn from_settings(settings: &AutomationSettings) -> Self {
        Self {
            action_timeout: Duration::from_millis(settings.action_timeout_ms),
            stale_screen_window: Duration::from_millis(settings.stale_screen_ms),
            ..Self::default()
        }
    }
}

fn debug_from_env() -> bool {
    std::env::var("FREEZER_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
