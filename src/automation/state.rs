use serde::{Deserialize, Serialize};

use crate::error::FreezeError;

/// Externally visible step of the shared automation actor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AutomationState {
    #[default]
    Idle,
    AwaitingStopScreen,
    AwaitingConfirmScreen,
    AwaitingDismiss,
}

impl AutomationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AutomationState::Idle)
    }
}

/// How one freeze attempt ended. Aborted attempts produce no report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub application_id: String,
    pub result: Result<(), FreezeError>,
}

impl AttemptReport {
    pub fn success(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            result: Ok(()),
        }
    }

    pub fn failure(application_id: impl Into<String>, error: FreezeError) -> Self {
        Self {
            application_id: application_id.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
