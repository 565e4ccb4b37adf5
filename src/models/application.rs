use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How eagerly an application gets frozen.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FreezeMode {
    /// Frozen whenever it is running, no matter when it was last used.
    Always,
    /// Never frozen.
    Never,
    /// Frozen when running but not used within the recency window.
    #[default]
    WhenInactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub freeze_mode: FreezeMode,
    pub is_running: bool,
    /// Not reported by every host version.
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_system: bool,
}

impl Application {
    pub fn new(id: impl Into<String>, freeze_mode: FreezeMode, is_running: bool) -> Self {
        Self {
            id: id.into(),
            freeze_mode,
            is_running,
            last_used: None,
            is_system: false,
        }
    }
}

/// Aggregated usage of one application over the recency window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageSample {
    pub application_id: String,
    pub foreground_time: Duration,
    pub last_time_used: Option<DateTime<Utc>>,
}

/// Status line shown next to an application in a list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FreezeStatus {
    PendingFreeze,
    Frozen,
    FreezeOff,
    UsedRecently,
    UsedRecentlyAndFrozen,
}

impl FreezeStatus {
    pub fn describe(&self) -> &'static str {
        match self {
            FreezeStatus::PendingFreeze => "Pending freeze",
            FreezeStatus::Frozen => "Frozen",
            FreezeStatus::FreezeOff => "Freeze off",
            FreezeStatus::UsedRecently => "Used recently",
            FreezeStatus::UsedRecentlyAndFrozen => "Used recently and frozen",
        }
    }
}
