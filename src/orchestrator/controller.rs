use std::{
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use tokio::{
    sync::{oneshot::error::TryRecvError, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};
use uuid::Uuid;

use crate::automation::AutomationHandle;
use crate::error::FreezeError;
use crate::settings::AutomationSettings;

use super::state::{order_for_freeze, FreezeAttempt, QueuedApp, Session};
use super::{ForegroundSignal, OrchestratorState, Progress, SessionOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

type CompletionListener = Box<dyn FnOnce(SessionOutcome) + Send + 'static>;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// The freezer's own application id, always frozen last.
    pub self_id: Option<String>,

    /// Restarts of a whole attempt before the session gives up.
    pub max_restarts: u32,

    /// Wall-clock budget for one attempt, across all of its steps.
    pub attempt_deadline: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            self_id: None,
            max_restarts: 2,
            attempt_deadline: Duration::from_secs(20),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &AutomationSettings, self_id: Option<String>) -> Self {
        Self {
            self_id,
            max_restarts: settings.max_attempt_restarts,
            ..Self::default()
        }
    }
}

enum Resolution {
    Pending,
    Succeeded,
    Silent,
    Failed(FreezeError),
}

/// Walks a queue of applications through the automation actor one at a time.
///
/// `advance()` is safe to call any number of times: each call either starts
/// the next attempt, reports the one in flight, or does nothing.
#[derive(Clone)]
pub struct FreezeOrchestrator {
    automation: AutomationHandle,
    config: OrchestratorConfig,
    state: Arc<Mutex<OrchestratorState>>,
    foreground: ForegroundSignal,
    completion: Arc<StdMutex<Option<CompletionListener>>>,
    driver: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl FreezeOrchestrator {
    pub fn new(automation: AutomationHandle, config: OrchestratorConfig) -> Self {
        Self {
            automation,
            config,
            state: Arc::new(Mutex::new(OrchestratorState::Idle)),
            foreground: ForegroundSignal::new(),
            completion: Arc::new(StdMutex::new(None)),
            driver: Arc::new(StdMutex::new(None)),
        }
    }

    pub fn foreground(&self) -> &ForegroundSignal {
        &self.foreground
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, OrchestratorState::Running(_))
    }

    /// Installs the listener for the next session end, replacing any earlier one.
    pub fn on_complete(&self, listener: impl FnOnce(SessionOutcome) + Send + 'static) {
        let mut slot = self
            .completion
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Box::new(listener));
    }

    /// Begins a session over `ids`. Nothing is frozen until `advance()` runs.
    pub async fn start(&self, ids: Vec<String>) -> Result<String, FreezeError> {
        let mut state = self.state.lock().await;
        if !matches!(*state, OrchestratorState::Idle) {
            return Err(FreezeError::AlreadyRunning);
        }

        let queue = order_for_freeze(ids, self.config.self_id.as_deref());
        let session_id = Uuid::new_v4().to_string();
        log_info!(
            "starting freeze session {session_id} with {} application(s)",
            queue.len()
        );

        *state = OrchestratorState::Running(Session::new(
            session_id.clone(),
            queue,
            self.config.max_restarts,
        ));
        Ok(session_id)
    }

    /// Call whenever the controlling foreground actor becomes active.
    pub async fn advance(&self) -> Result<Progress, FreezeError> {
        let mut state = self.state.lock().await;
        let OrchestratorState::Running(session) = &mut *state else {
            return Ok(Progress::NotRunning);
        };

        let result = self.step(session).await;
        let outcome = match &result {
            Ok(Progress::Completed) => {
                log_info!(
                    "freeze session {} finished, froze {} application(s)",
                    session.id,
                    session.frozen.len()
                );
                Some(SessionOutcome::Completed {
                    session_id: session.id.clone(),
                    frozen: session.frozen.clone(),
                })
            }
            Err(error) => {
                log_error!("freeze session {} failed: {error}", session.id);
                self.automation.abort().await;
                Some(SessionOutcome::Failed {
                    session_id: session.id.clone(),
                    error: error.clone(),
                })
            }
            Ok(_) => None,
        };
        let Some(outcome) = outcome else {
            return result;
        };

        *state = OrchestratorState::Idle;
        drop(state);
        self.complete(outcome);
        result
    }

    /// Ends the running session, leaving the automation actor idle.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        let OrchestratorState::Running(session) = &*state else {
            return false;
        };
        let session_id = session.id.clone();

        self.automation.abort().await;
        *state = OrchestratorState::Idle;
        drop(state);

        self.stop_driver();
        log_info!("freeze session {session_id} cancelled");
        self.complete(SessionOutcome::Cancelled { session_id });
        true
    }

    /// Spawns a task that calls `advance()` each time the foreground signal is
    /// up, until the session ends.
    pub fn drive(&self) {
        self.stop_driver();

        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.drive_loop().await });

        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *driver = Some(handle);
    }

    async fn drive_loop(&self) {
        loop {
            self.foreground.wait_resumed().await;

            match self.advance().await {
                Ok(Progress::NotRunning) | Ok(Progress::Completed) | Err(_) => break,
                Ok(Progress::Started { .. }) | Ok(Progress::InFlight { .. }) | Ok(Progress::Waiting) => {
                    // Bounded so an attempt past its deadline gets reaped.
                    let _ = time::timeout(
                        self.config.attempt_deadline,
                        self.automation.wait_idle(),
                    )
                    .await;
                }
            }
        }
    }

    fn stop_driver(&self) {
        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = driver.take() {
            handle.abort();
        }
    }

    fn complete(&self, outcome: SessionOutcome) {
        let listener = self
            .completion
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match listener {
            Some(listener) => listener(outcome),
            None => log_info!("session {} ended with no listener", outcome.session_id()),
        }
    }

    async fn step(&self, session: &mut Session) -> Result<Progress, FreezeError> {
        if let Some(attempt) = session.current.as_mut() {
            match self.resolve(attempt).await {
                Resolution::Pending => {
                    return Ok(Progress::InFlight {
                        application_id: attempt.application_id.clone(),
                    });
                }
                Resolution::Succeeded => {
                    session.frozen.push(attempt.application_id.clone());
                    session.current = None;
                }
                Resolution::Silent => {
                    log_warn!(
                        "attempt on {} finished without a report",
                        attempt.application_id
                    );
                    session.current = None;
                }
                Resolution::Failed(error) => {
                    let application_id = attempt.application_id.clone();
                    let retries_remaining = attempt.retries_remaining;
                    session.current = None;

                    if retries_remaining == 0 {
                        return Err(FreezeError::RetriesExhausted {
                            application_id,
                            last_error: Box::new(error),
                        });
                    }
                    log_warn!(
                        "freezing {application_id} failed ({error}), {retries_remaining} restart(s) left"
                    );
                    return self
                        .launch(
                            session,
                            QueuedApp {
                                application_id,
                                retries_remaining: retries_remaining - 1,
                            },
                        )
                        .await;
                }
            }
        }

        match session.remaining.pop_front() {
            Some(next) => self.launch(session, next).await,
            None => Ok(Progress::Completed),
        }
    }

    async fn resolve(&self, attempt: &mut FreezeAttempt) -> Resolution {
        // Read the actor state before the outcome: reports are sent before
        // idle is published, so idle here means the outcome is already known.
        let machine_idle = self.automation.is_idle();

        match attempt.outcome.try_recv() {
            Ok(report) => match report.result {
                Ok(()) => Resolution::Succeeded,
                Err(error) => Resolution::Failed(error),
            },
            // Aborted underneath us, e.g. the host tore down the surface.
            Err(TryRecvError::Closed) => Resolution::Silent,
            Err(TryRecvError::Empty) if machine_idle => Resolution::Silent,
            Err(TryRecvError::Empty) => {
                if Instant::now() < attempt.deadline {
                    return Resolution::Pending;
                }
                log_warn!(
                    "attempt on {} overran its deadline, aborting",
                    attempt.application_id
                );
                self.automation.abort().await;
                Resolution::Failed(FreezeError::Timeout)
            }
        }
    }

    async fn launch(
        &self,
        session: &mut Session,
        queued: QueuedApp,
    ) -> Result<Progress, FreezeError> {
        let QueuedApp {
            application_id,
            mut retries_remaining,
        } = queued;

        loop {
            match self.automation.start(&application_id).await {
                Ok(ticket) => {
                    session.current = Some(FreezeAttempt {
                        application_id: application_id.clone(),
                        retries_remaining,
                        deadline: Instant::now() + self.config.attempt_deadline,
                        outcome: ticket.outcome,
                    });
                    return Ok(Progress::Started { application_id });
                }
                Err(FreezeError::AlreadyInProgress) => {
                    session.remaining.push_front(QueuedApp {
                        application_id,
                        retries_remaining,
                    });
                    return Ok(Progress::Waiting);
                }
                Err(error) if error.is_attempt_failure() => {
                    if retries_remaining == 0 {
                        return Err(FreezeError::RetriesExhausted {
                            application_id,
                            last_error: Box::new(error),
                        });
                    }
                    log_warn!("could not start freezing {application_id}: {error}");
                    retries_remaining -= 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
