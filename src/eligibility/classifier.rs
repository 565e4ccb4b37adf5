use chrono::{DateTime, Utc};

use crate::models::{Application, FreezeMode, FreezeStatus, UsageSample};

use super::EligibilityConfig;

/// Decides which running applications should be frozen.
///
/// Pure and cheap: evaluate it again on every pass instead of caching the
/// answer, since running state and usage change underneath.
#[derive(Debug, Clone, Default)]
pub struct EligibilityClassifier {
    config: EligibilityConfig,
}

impl EligibilityClassifier {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// The mode that actually applies on this host.
    pub fn effective_mode(&self, app: &Application) -> FreezeMode {
        match app.freeze_mode {
            FreezeMode::WhenInactive if !self.config.usage_stats_available => FreezeMode::Never,
            mode => mode,
        }
    }

    pub fn is_pending_freeze(&self, app: &Application, usage: Option<&UsageSample>) -> bool {
        self.is_pending_freeze_at(app, usage, Utc::now())
    }

    pub fn is_pending_freeze_at(
        &self,
        app: &Application,
        usage: Option<&UsageSample>,
        now: DateTime<Utc>,
    ) -> bool {
        if !app.is_running {
            return false;
        }

        match self.effective_mode(app) {
            FreezeMode::Always => true,
            FreezeMode::Never => false,
            FreezeMode::WhenInactive => self.unused_recently(app, usage, now),
        }
    }

    pub fn explain(&self, app: &Application, usage: Option<&UsageSample>) -> FreezeStatus {
        self.explain_at(app, usage, Utc::now())
    }

    pub fn explain_at(
        &self,
        app: &Application,
        usage: Option<&UsageSample>,
        now: DateTime<Utc>,
    ) -> FreezeStatus {
        let frozen_or_pending = if app.is_running {
            FreezeStatus::PendingFreeze
        } else {
            FreezeStatus::Frozen
        };

        match self.effective_mode(app) {
            FreezeMode::Always => frozen_or_pending,
            FreezeMode::Never => FreezeStatus::FreezeOff,
            FreezeMode::WhenInactive => {
                if self.unused_recently(app, usage, now) {
                    frozen_or_pending
                } else if app.is_running {
                    FreezeStatus::UsedRecently
                } else {
                    FreezeStatus::UsedRecentlyAndFrozen
                }
            }
        }
    }

    fn unused_recently(
        &self,
        app: &Application,
        usage: Option<&UsageSample>,
        now: DateTime<Utc>,
    ) -> bool {
        // The user is looking at the freezer right now.
        if self.config.self_id.as_deref() == Some(app.id.as_str()) {
            return false;
        }

        let Some(sample) = usage else {
            return true;
        };

        if sample.foreground_time < self.config.min_foreground {
            return true;
        }

        match sample.last_time_used.or(app.last_used) {
            Some(last_used) => now
                .signed_duration_since(last_used)
                .to_std()
                .map(|age| age > self.config.recency_window)
                .unwrap_or(false),
            None => false,
        }
    }
}
