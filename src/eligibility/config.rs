use std::time::Duration;

use crate::settings::FreezerSettings;

/// Tunables for deciding whether an application is pending freeze.
#[derive(Debug, Clone)]
pub struct EligibilityConfig {
    /// Trailing window the usage sample is aggregated over.
    pub recency_window: Duration,

    /// Foreground time below this counts as "not used".
    pub min_foreground: Duration,

    /// When the host cannot report usage, WHEN_INACTIVE degrades to NEVER.
    pub usage_stats_available: bool,

    /// The freezer's own application id; never considered inactive.
    pub self_id: Option<String>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            recency_window: Duration::from_secs(7 * 24 * 60 * 60),
            min_foreground: Duration::from_secs(2),
            usage_stats_available: true,
            self_id: None,
        }
    }
}

impl EligibilityConfig {
    pub fn from_settings(
        settings: &FreezerSettings,
        usage_stats_available: bool,
        self_id: Option<String>,
    ) -> Self {
        Self {
            recency_window: Duration::from_secs(
                u64::from(settings.autofreeze_delay_days) * 24 * 60 * 60,
            ),
            min_foreground: Duration::from_secs(settings.min_foreground_secs),
            usage_stats_available,
            self_id,
        }
    }
}
