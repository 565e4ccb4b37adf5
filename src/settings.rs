use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Which normally hidden applications show up in the inventory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShownSpecialApps {
    pub launcher: bool,
    pub self_app: bool,
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSettings {
    pub action_timeout_ms: u64,
    pub stale_screen_ms: u64,
    pub max_attempt_restarts: u32,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            action_timeout_ms: 4_000,
            stale_screen_ms: 8_000,
            max_attempt_restarts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FreezerSettings {
    pub autofreeze_delay_days: u32,
    pub min_foreground_secs: u64,
    pub freeze_on_screen_off: bool,
    pub shown_special_apps: ShownSpecialApps,
    pub automation: AutomationSettings,
}

impl Default for FreezerSettings {
    fn default() -> Self {
        Self {
            autofreeze_delay_days: 7,
            min_foreground_secs: 2,
            freeze_on_screen_off: false,
            shown_special_apps: ShownSpecialApps::default(),
            automation: AutomationSettings::default(),
        }
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<FreezerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring malformed settings at {}: {err}",
                    path.display()
                );
                FreezerSettings::default()
            })
        } else {
            FreezerSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(settings: FreezerSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(settings),
        }
    }

    pub fn get(&self) -> FreezerSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update(&self, change: impl FnOnce(&mut FreezerSettings)) -> Result<FreezerSettings> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        change(&mut guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    pub fn set_freeze_on_screen_off(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.freeze_on_screen_off = enabled)
            .map(|_| ())
    }

    fn persist(&self, data: &FreezerSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let contents = fs::read_to_string(path)?;
        let data: FreezerSettings = serde_json::from_str(&contents)?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = data;
        Ok(())
    }
}
