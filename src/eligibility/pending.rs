use anyhow::{Context, Result};

use crate::host::InventorySource;
use crate::models::Application;
use crate::settings::ShownSpecialApps;

use super::EligibilityClassifier;

/// Lists installed applications, hiding the launcher, the freezer itself and
/// system applications unless the user asked to see them.
pub fn list_candidates(
    source: &dyn InventorySource,
    shown: &ShownSpecialApps,
    self_id: Option<&str>,
) -> Result<Vec<Application>> {
    let launcher = source.launcher_id();
    let apps = source
        .list_applications()
        .context("failed to list installed applications")?;

    Ok(apps
        .into_iter()
        .filter(|app| {
            if !shown.launcher && launcher.as_deref() == Some(app.id.as_str()) {
                return false;
            }
            if !shown.self_app && self_id == Some(app.id.as_str()) {
                return false;
            }
            if !shown.system && app.is_system {
                return false;
            }
            true
        })
        .collect())
}

/// Recomputes the pending-freeze set from a fresh listing.
pub fn apps_pending_freeze(
    source: &dyn InventorySource,
    classifier: &EligibilityClassifier,
    shown: &ShownSpecialApps,
) -> Result<Vec<String>> {
    let window = classifier.config().recency_window;
    let self_id = classifier.config().self_id.as_deref();

    let pending = list_candidates(source, shown, self_id)?
        .into_iter()
        .filter(|app| {
            let usage = source.usage_sample(&app.id, window);
            classifier.is_pending_freeze(app, usage.as_ref())
        })
        .map(|app| app.id)
        .collect();

    Ok(pending)
}
