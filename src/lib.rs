pub mod automation;
pub mod eligibility;
pub mod error;
pub mod host;
pub mod models;
pub mod orchestrator;
pub mod screen_off;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

pub use automation::{AutomationConfig, AutomationHandle, AutomationState, NotificationSink};
pub use eligibility::{EligibilityClassifier, EligibilityConfig};
pub use error::FreezeError;
pub use host::{ActionDispatcher, InventorySource, NotificationBridge};
pub use models::{Application, FreezeMode, FreezeStatus, UsageSample};
pub use orchestrator::{
    ForegroundSignal, FreezeOrchestrator, OrchestratorConfig, Progress, SessionOutcome,
};
pub use screen_off::{ScreenOffResponse, ScreenOffTrigger};
pub use settings::{FreezerSettings, SettingsStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FreezeRequest {
    NothingToFreeze,
    Started { session_id: String, count: usize },
}

/// The freezer service: one automation actor, one orchestrator, and the
/// inventory they are fed from.
pub struct Freezer {
    inventory: Arc<dyn InventorySource>,
    settings: Arc<SettingsStore>,
    automation: AutomationHandle,
    orchestrator: FreezeOrchestrator,
    self_id: Option<String>,
}

impl Freezer {
    /// Spawns the automation actor and hands its sink to `bridge`. Must run
    /// inside a tokio runtime.
    pub fn new(
        inventory: Arc<dyn InventorySource>,
        dispatcher: Arc<dyn ActionDispatcher>,
        bridge: &dyn NotificationBridge,
        settings: Arc<SettingsStore>,
        self_id: Option<String>,
    ) -> Result<Self> {
        let current = settings.get();
        let automation = AutomationHandle::spawn(
            dispatcher,
            AutomationConfig::from_settings(&current.automation),
        );

        if let Err(err) = bridge.register(automation.sink()) {
            automation.shutdown();
            return Err(err).context("failed to register for screen notifications");
        }

        let orchestrator = FreezeOrchestrator::new(
            automation.clone(),
            OrchestratorConfig::from_settings(&current.automation, self_id.clone()),
        );

        info!("freezer ready (self id: {})", self_id.as_deref().unwrap_or("unknown"));

        Ok(Self {
            inventory,
            settings,
            automation,
            orchestrator,
            self_id,
        })
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Built from the current settings, so edits apply on the next call.
    pub fn classifier(&self) -> EligibilityClassifier {
        EligibilityClassifier::new(EligibilityConfig::from_settings(
            &self.settings.get(),
            self.inventory.usage_stats_available(),
            self.self_id.clone(),
        ))
    }

    pub fn pending_freeze(&self) -> Result<Vec<String>> {
        eligibility::apps_pending_freeze(
            self.inventory.as_ref(),
            &self.classifier(),
            &self.settings.get().shown_special_apps,
        )
    }

    /// Every listed application with the status shown next to it.
    pub fn statuses(&self) -> Result<Vec<(Application, FreezeStatus)>> {
        let classifier = self.classifier();
        let window = classifier.config().recency_window;
        let apps = eligibility::list_candidates(
            self.inventory.as_ref(),
            &self.settings.get().shown_special_apps,
            self.self_id.as_deref(),
        )?;

        Ok(apps
            .into_iter()
            .map(|app| {
                let usage = self.inventory.usage_sample(&app.id, window);
                let status = classifier.explain(&app, usage.as_ref());
                (app, status)
            })
            .collect())
    }

    pub async fn freeze_pending(&self) -> Result<FreezeRequest> {
        let pending = self.pending_freeze()?;
        Ok(self.freeze(pending).await?)
    }

    /// Starts a session over `ids` and lets the foreground signal drive it.
    pub async fn freeze(&self, ids: Vec<String>) -> Result<FreezeRequest, FreezeError> {
        if ids.is_empty() {
            return Ok(FreezeRequest::NothingToFreeze);
        }
        let count = ids.len();
        let session_id = self.orchestrator.start(ids).await?;
        self.orchestrator.drive();
        Ok(FreezeRequest::Started { session_id, count })
    }

    pub fn on_complete(&self, listener: impl FnOnce(SessionOutcome) + Send + 'static) {
        self.orchestrator.on_complete(listener);
    }

    /// The host calls `resumed()`/`paused()` on this as the foreground actor
    /// comes and goes.
    pub fn foreground(&self) -> &ForegroundSignal {
        self.orchestrator.foreground()
    }

    pub fn automation_state(&self) -> AutomationState {
        self.automation.state()
    }

    pub async fn is_freezing(&self) -> bool {
        self.orchestrator.is_running().await
    }

    pub async fn cancel(&self) -> bool {
        self.orchestrator.cancel().await
    }

    pub async fn shutdown(&self) {
        self.orchestrator.cancel().await;
        self.automation.shutdown();
        info!("freezer shut down");
    }
}
