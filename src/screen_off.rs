//! Starts a freeze session when the screen turns off, if the user enabled it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use log::info;
use serde::Serialize;
use tokio::time::Instant;

use crate::{FreezeRequest, Freezer};

const SCREEN_OFF_THROTTLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ScreenOffResponse {
    Disabled,
    NothingPending,
    Throttled,
    Started { session_id: String },
}

pub struct ScreenOffTrigger {
    freezer: Arc<Freezer>,
    last_triggered: Mutex<Option<Instant>>,
    throttle: Duration,
}

impl ScreenOffTrigger {
    pub fn new(freezer: Arc<Freezer>) -> Self {
        Self {
            freezer,
            last_triggered: Mutex::new(None),
            throttle: SCREEN_OFF_THROTTLE,
        }
    }

    pub async fn on_screen_off(&self) -> Result<ScreenOffResponse> {
        if !self.freezer.settings().get().freeze_on_screen_off {
            return Ok(ScreenOffResponse::Disabled);
        }

        // A freeze left over from the last time the screen was on is stale.
        self.freezer.cancel().await;

        let pending = self.freezer.pending_freeze()?;
        if pending.is_empty() {
            return Ok(ScreenOffResponse::NothingPending);
        }

        let now = Instant::now();
        {
            let mut last = self
                .last_triggered
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(previous) = *last {
                if now.saturating_duration_since(previous) < self.throttle {
                    return Ok(ScreenOffResponse::Throttled);
                }
            }
            *last = Some(now);
        }

        info!("screen off: freezing {} application(s)", pending.len());
        match self.freezer.freeze(pending).await? {
            FreezeRequest::Started { session_id, .. } => Ok(ScreenOffResponse::Started { session_id }),
            FreezeRequest::NothingToFreeze => Ok(ScreenOffResponse::NothingPending),
        }
    }
}
