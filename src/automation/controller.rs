use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::error::FreezeError;
use crate::host::{ActionDispatcher, ScreenNotification};

use super::{AttemptReport, AutomationConfig, AutomationMachine, AutomationState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

enum Command {
    Start {
        application_id: String,
        reply: oneshot::Sender<Result<AttemptTicket, FreezeError>>,
    },
    Notification(ScreenNotification),
    Abort {
        reply: oneshot::Sender<Option<String>>,
    },
}

/// Receipt for a started attempt. Resolves with the attempt's report, or with
/// a closed channel when the attempt was aborted.
#[derive(Debug)]
pub struct AttemptTicket {
    pub application_id: String,
    pub outcome: oneshot::Receiver<AttemptReport>,
}

/// Where the host pushes screen-change notifications. Cheap to clone and safe
/// to call from synchronous host callbacks.
#[derive(Clone)]
pub struct NotificationSink {
    tx: mpsc::UnboundedSender<Command>,
}

impl NotificationSink {
    /// Returns false once the automation actor has shut down.
    pub fn deliver(&self, notification: ScreenNotification) -> bool {
        self.tx.send(Command::Notification(notification)).is_ok()
    }
}

/// Handle to the single automation actor. Every state change happens on the
/// actor task; this handle only sends commands and reads the published state.
#[derive(Clone)]
pub struct AutomationHandle {
    tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<AutomationState>,
    cancel_token: CancellationToken,
    worker: Arc<JoinHandle<()>>,
}

impl AutomationHandle {
    pub fn spawn(dispatcher: Arc<dyn ActionDispatcher>, config: AutomationConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(AutomationState::Idle);
        let cancel_token = CancellationToken::new();

        let machine = AutomationMachine::new(dispatcher, config);
        let worker = tokio::spawn(automation_loop(machine, rx, state_tx, cancel_token.clone()));

        Self {
            tx,
            state: state_rx,
            cancel_token,
            worker: Arc::new(worker),
        }
    }

    pub fn sink(&self) -> NotificationSink {
        NotificationSink {
            tx: self.tx.clone(),
        }
    }

    pub fn state(&self) -> AutomationState {
        *self.state.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    pub async fn start(&self, application_id: &str) -> Result<AttemptTicket, FreezeError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Start {
                application_id: application_id.to_string(),
                reply,
            })
            .map_err(|_| FreezeError::ActorStopped)?;
        response.await.map_err(|_| FreezeError::ActorStopped)?
    }

    /// Resets the actor to idle and cancels its timeout. Once this returns the
    /// actor is idle.
    pub async fn abort(&self) -> Option<String> {
        let (reply, response) = oneshot::channel();
        if self.tx.send(Command::Abort { reply }).is_err() {
            return None;
        }
        response.await.ok().flatten()
    }

    /// Resolves as soon as the actor is idle, immediately if it already is.
    pub async fn wait_idle(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|state| state.is_idle()).await;
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

async fn automation_loop(
    mut machine: AutomationMachine,
    mut rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<AutomationState>,
    cancel_token: CancellationToken,
) {
    let mut pending: Option<oneshot::Sender<AttemptReport>> = None;

    loop {
        let deadline = machine.deadline();

        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                machine.abort();
                log_info!("automation actor shutting down");
                break;
            }
            command = rx.recv() => {
                let Some(command) = command else {
                    machine.abort();
                    break;
                };
                match command {
                    Command::Start { application_id, reply } => {
                        let result = machine.start(&application_id, Instant::now()).map(|()| {
                            let (report_tx, report_rx) = oneshot::channel();
                            pending = Some(report_tx);
                            AttemptTicket {
                                application_id: application_id.clone(),
                                outcome: report_rx,
                            }
                        });
                        if let Err(err) = &result {
                            log_warn!("refused to start freezing {application_id}: {err}");
                        }
                        // Busy is visible before the caller holds the ticket.
                        state_tx.send_replace(machine.state());
                        // A caller that went away leaves the attempt running unobserved.
                        let _ = reply.send(result);
                    }
                    Command::Notification(notification) => {
                        if let Some(report) = machine.on_screen_notification(&notification, Instant::now()) {
                            deliver(&mut pending, report);
                        }
                    }
                    Command::Abort { reply } => {
                        let aborted = machine.abort();
                        // Dropping the sender tells the ticket holder it was aborted.
                        pending = None;
                        let _ = reply.send(aborted);
                    }
                }
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(report) = machine.on_timeout(Instant::now()) {
                    deliver(&mut pending, report);
                }
            }
        }

        // Reports go out before the idle state is published, so anyone who
        // observes idle can already read the outcome.
        state_tx.send_replace(machine.state());
    }

    state_tx.send_replace(AutomationState::Idle);
}

fn deliver(pending: &mut Option<oneshot::Sender<AttemptReport>>, report: AttemptReport) {
    match pending.take() {
        Some(tx) => {
            if tx.send(report).is_err() {
                log_warn!("attempt report dropped: no listener");
            }
        }
        None => log_warn!("attempt report for {} with no ticket", report.application_id),
    }
}
