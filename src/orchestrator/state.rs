use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::oneshot, time::Instant};

use crate::automation::AttemptReport;
use crate::error::FreezeError;

/// An application waiting its turn, with the restarts it has left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedApp {
    pub application_id: String,
    pub retries_remaining: u32,
}

/// The attempt currently handed to the automation actor.
#[derive(Debug)]
pub struct FreezeAttempt {
    pub application_id: String,
    pub retries_remaining: u32,
    /// Past this point a still-busy attempt is abandoned as timed out.
    pub deadline: Instant,
    pub outcome: oneshot::Receiver<AttemptReport>,
}

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub remaining: VecDeque<QueuedApp>,
    pub current: Option<FreezeAttempt>,
    pub frozen: Vec<String>,
}

impl Session {
    pub fn new(id: String, queue: Vec<String>, retries: u32) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            remaining: queue
                .into_iter()
                .map(|application_id| QueuedApp {
                    application_id,
                    retries_remaining: retries,
                })
                .collect(),
            current: None,
            frozen: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub enum OrchestratorState {
    #[default]
    Idle,
    Running(Session),
}

/// What one `advance()` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Progress {
    /// No session is running; nothing to do.
    NotRunning,
    /// A new attempt was handed to the automation actor.
    Started { application_id: String },
    /// The current attempt has not finished yet.
    InFlight { application_id: String },
    /// The automation actor is busy with something else; try again later.
    Waiting,
    /// The queue is empty and the session ended.
    Completed,
}

/// Delivered once to the completion listener when a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SessionOutcome {
    Completed {
        session_id: String,
        frozen: Vec<String>,
    },
    Failed {
        session_id: String,
        error: FreezeError,
    },
    Cancelled {
        session_id: String,
    },
}

impl SessionOutcome {
    pub fn session_id(&self) -> &str {
        match self {
            SessionOutcome::Completed { session_id, .. }
            | SessionOutcome::Failed { session_id, .. }
            | SessionOutcome::Cancelled { session_id } => session_id,
        }
    }
}

/// Moves the freezer's own identity to the end, since freezing it stops the
/// process doing the freezing.
pub fn order_for_freeze(ids: Vec<String>, self_id: Option<&str>) -> Vec<String> {
    let Some(self_id) = self_id else {
        return ids;
    };

    let (mine, mut others): (Vec<String>, Vec<String>) =
        ids.into_iter().partition(|id| id == self_id);
    if !mine.is_empty() {
        others.push(self_id.to_string());
    }
    others
}
