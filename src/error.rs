use serde::Serialize;
use thiserror::Error;

/// Errors produced by the automation actor and the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FreezeError {
    #[error("a freeze attempt is already in progress")]
    AlreadyInProgress,

    #[error("an orchestration session is already running")]
    AlreadyRunning,

    #[error("could not find the '{control}' control")]
    ControlNotFound { control: String },

    #[error("unexpected screen '{screen}'")]
    UnexpectedScreen { screen: String },

    #[error("timed out waiting for the next screen")]
    Timeout,

    #[error("gave up freezing {application_id}: {last_error}")]
    RetriesExhausted {
        application_id: String,
        last_error: Box<FreezeError>,
    },

    #[error("host automation call failed: {message}")]
    Host { message: String },

    #[error("automation actor is no longer running")]
    ActorStopped,
}

impl FreezeError {
    /// Failures that count against an attempt's retry budget.
    pub fn is_attempt_failure(&self) -> bool {
        matches!(
            self,
            FreezeError::ControlNotFound { .. }
                | FreezeError::UnexpectedScreen { .. }
                | FreezeError::Timeout
                | FreezeError::Host { .. }
        )
    }
}

impl From<FreezeError> for String {
    fn from(e: FreezeError) -> Self {
        e.to_string()
    }
}
