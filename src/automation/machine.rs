use std::sync::Arc;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::error::FreezeError;
use crate::host::{ActionDispatcher, ControlNode, ScreenKind, ScreenNotification};

use super::lookup::locate;
use super::{AttemptReport, AutomationConfig, AutomationState, ControlLookup};

/// Bookkeeping for the attempt currently driving the host screen.
#[derive(Debug, Clone)]
struct Step {
    application_id: String,
    last_action_at: Instant,
}

impl Step {
    fn touched(self, now: Instant) -> Self {
        Self {
            last_action_at: now,
            ..self
        }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    AwaitingStopScreen(Step),
    AwaitingConfirmScreen(Step),
    AwaitingDismiss(Step),
}

impl Phase {
    fn step(&self) -> Option<&Step> {
        match self {
            Phase::Idle => None,
            Phase::AwaitingStopScreen(step)
            | Phase::AwaitingConfirmScreen(step)
            | Phase::AwaitingDismiss(step) => Some(step),
        }
    }
}

enum Press {
    Clicked,
    NotClickable,
    NotFound,
}

/// Drives the stop, confirm, dismiss sequence for one application at a time.
///
/// Synchronous and clock-agnostic: every input carries `now`. The actor in
/// `controller.rs` owns the only instance and feeds it notifications and
/// timer expiries.
pub struct AutomationMachine {
    dispatcher: Arc<dyn ActionDispatcher>,
    config: AutomationConfig,
    phase: Phase,
}

impl AutomationMachine {
    pub fn new(dispatcher: Arc<dyn ActionDispatcher>, config: AutomationConfig) -> Self {
        Self {
            dispatcher,
            config,
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> AutomationState {
        match self.phase {
            Phase::Idle => AutomationState::Idle,
            Phase::AwaitingStopScreen(_) => AutomationState::AwaitingStopScreen,
            Phase::AwaitingConfirmScreen(_) => AutomationState::AwaitingConfirmScreen,
            Phase::AwaitingDismiss(_) => AutomationState::AwaitingDismiss,
        }
    }

    pub fn current_application(&self) -> Option<&str> {
        self.phase.step().map(|step| step.application_id.as_str())
    }

    /// When the armed timeout fires, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.phase
            .step()
            .map(|step| step.last_action_at + self.config.action_timeout)
    }

    pub fn start(&mut self, application_id: &str, now: Instant) -> Result<(), FreezeError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(FreezeError::AlreadyInProgress);
        }

        self.phase = Phase::AwaitingStopScreen(Step {
            application_id: application_id.to_string(),
            last_action_at: now,
        });

        if let Err(err) = self.dispatcher.request_management_screen(application_id) {
            warn!("Could not open management screen for {application_id}: {err:#}");
            self.phase = Phase::Idle;
            return Err(FreezeError::Host {
                message: format!("{err:#}"),
            });
        }

        info!("Freezing {application_id}");
        Ok(())
    }

    pub fn on_screen_notification(
        &mut self,
        notification: &ScreenNotification,
        now: Instant,
    ) -> Option<AttemptReport> {
        if self.config.verbose {
            debug!(
                "Screen '{}' while {:?}",
                notification.screen_kind.as_str(),
                self.state()
            );
        }

        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let (next, report) = match phase {
            Phase::Idle => (Phase::Idle, None),
            Phase::AwaitingStopScreen(step) => self.on_stop_screen(step, notification, now),
            Phase::AwaitingConfirmScreen(step) => self.on_confirm_screen(step, notification, now),
            Phase::AwaitingDismiss(step) => self.on_dismiss_screen(step, notification, now),
        };
        self.phase = next;
        report
    }

    /// Gives up on the attempt once its deadline has passed. Early or
    /// duplicate calls are ignored.
    pub fn on_timeout(&mut self, now: Instant) -> Option<AttemptReport> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }

        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let step = phase.step()?;
        warn!(
            "Timed out freezing {} after {:?}",
            step.application_id, self.config.action_timeout
        );
        Some(AttemptReport::failure(
            step.application_id.clone(),
            FreezeError::Timeout,
        ))
    }

    /// Drops the current attempt without reporting. Returns the application
    /// that was being frozen.
    pub fn abort(&mut self) -> Option<String> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        phase.step().map(|step| {
            info!("Aborted freezing {}", step.application_id);
            step.application_id.clone()
        })
    }

    fn on_stop_screen(
        &self,
        step: Step,
        notification: &ScreenNotification,
        now: Instant,
    ) -> (Phase, Option<AttemptReport>) {
        if notification.screen_kind != ScreenKind::AppDetails {
            return self.unexpected(Phase::AwaitingStopScreen(step), notification, now);
        }

        match self.press(
            &self.config.force_stop,
            &notification.control_snapshot,
            "force stop",
        ) {
            Press::Clicked => (Phase::AwaitingConfirmScreen(step.touched(now)), None),
            Press::NotClickable => {
                // Greyed out: the application is already stopped.
                info!(
                    "{} is already stopped, leaving the details screen",
                    step.application_id
                );
                self.dispatcher.navigate_back();
                (Phase::Idle, Some(AttemptReport::success(step.application_id)))
            }
            Press::NotFound => (
                Phase::Idle,
                Some(AttemptReport::failure(
                    step.application_id,
                    FreezeError::ControlNotFound {
                        control: "force stop".into(),
                    },
                )),
            ),
        }
    }

    fn on_confirm_screen(
        &self,
        step: Step,
        notification: &ScreenNotification,
        now: Instant,
    ) -> (Phase, Option<AttemptReport>) {
        if notification.screen_kind != ScreenKind::ConfirmDialog {
            return self.unexpected(Phase::AwaitingConfirmScreen(step), notification, now);
        }

        match self.press(&self.config.confirm, &notification.control_snapshot, "OK") {
            Press::Clicked => (Phase::AwaitingDismiss(step.touched(now)), None),
            Press::NotClickable | Press::NotFound => (
                Phase::Idle,
                Some(AttemptReport::failure(
                    step.application_id,
                    FreezeError::ControlNotFound {
                        control: "OK".into(),
                    },
                )),
            ),
        }
    }

    fn on_dismiss_screen(
        &self,
        step: Step,
        notification: &ScreenNotification,
        now: Instant,
    ) -> (Phase, Option<AttemptReport>) {
        if notification.screen_kind != ScreenKind::AppDetails {
            return self.unexpected(Phase::AwaitingDismiss(step), notification, now);
        }

        self.dispatcher.navigate_back();
        info!("Froze {}", step.application_id);
        (Phase::Idle, Some(AttemptReport::success(step.application_id)))
    }

    /// The expected screen may simply not have rendered yet; only a stale
    /// attempt is abandoned.
    fn unexpected(
        &self,
        phase: Phase,
        notification: &ScreenNotification,
        now: Instant,
    ) -> (Phase, Option<AttemptReport>) {
        let stale_id = phase
            .step()
            .filter(|step| {
                now.saturating_duration_since(step.last_action_at)
                    > self.config.stale_screen_window
            })
            .map(|step| step.application_id.clone());

        let Some(application_id) = stale_id else {
            return (phase, None);
        };

        let screen = notification.screen_kind.as_str().to_string();
        warn!("Giving up on {application_id}: stuck on unexpected screen '{screen}'");
        let report = AttemptReport::failure(application_id, FreezeError::UnexpectedScreen { screen });
        (Phase::Idle, Some(report))
    }

    fn press(&self, chain: &[ControlLookup], root: &ControlNode, name: &str) -> Press {
        let Some(nodes) = locate(chain, root) else {
            warn!("Could not find the {name} button.");
            return Press::NotFound;
        };
        if nodes.len() > 1 {
            warn!("Found more than one {name} button, clicking them all.");
        }

        let clickable: Vec<&ControlNode> =
            nodes.into_iter().filter(|node| node.is_clickable()).collect();
        if clickable.is_empty() {
            info!("The {name} button is not clickable.");
            return Press::NotClickable;
        }

        let clicked = clickable
            .iter()
            .filter(|node| self.dispatcher.dispatch_click(&node.id))
            .count();
        if clicked == 0 {
            warn!("Every click on the {name} button was rejected.");
            return Press::NotFound;
        }
        Press::Clicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        app_details, app_details_stopped, confirm_dialog, other_screen, Action, RecordingDispatcher,
    };
    use std::time::Duration;

    fn machine() -> (AutomationMachine, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let config = AutomationConfig {
            verbose: false,
            ..AutomationConfig::default()
        };
        (AutomationMachine::new(dispatcher.clone(), config), dispatcher)
    }

    #[test]
    fn test_full_freeze_sequence() {
        let (mut machine, dispatcher) = machine();
        let t0 = Instant::now();

        machine.start("app1", t0).unwrap();
        assert_eq!(machine.state(), AutomationState::AwaitingStopScreen);

        assert!(machine.on_screen_notification(&app_details(), t0).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingConfirmScreen);

        assert!(machine.on_screen_notification(&confirm_dialog(), t0).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingDismiss);

        let report = machine.on_screen_notification(&app_details(), t0).unwrap();
        assert_eq!(report, AttemptReport::success("app1"));
        assert_eq!(machine.state(), AutomationState::Idle);
        assert_eq!(machine.deadline(), None);

        assert_eq!(
            dispatcher.actions(),
            vec![
                Action::RequestScreen("app1".into()),
                Action::Click("force-stop".into()),
                Action::Click("ok".into()),
                Action::Back,
            ]
        );
    }

    #[test]
    fn test_second_start_is_rejected_and_changes_nothing() {
        let (mut machine, dispatcher) = machine();
        let t0 = Instant::now();

        machine.start("app1", t0).unwrap();
        let deadline = machine.deadline();

        assert_eq!(
            machine.start("app2", t0 + Duration::from_secs(1)),
            Err(FreezeError::AlreadyInProgress)
        );
        assert_eq!(machine.state(), AutomationState::AwaitingStopScreen);
        assert_eq!(machine.current_application(), Some("app1"));
        assert_eq!(machine.deadline(), deadline);
        assert_eq!(dispatcher.actions().len(), 1);
    }

    #[test]
    fn test_disabled_force_stop_skips_to_dismiss() {
        let (mut machine, dispatcher) = machine();
        let t0 = Instant::now();

        machine.start("app1", t0).unwrap();
        let report = machine
            .on_screen_notification(&app_details_stopped(), t0)
            .unwrap();

        assert!(report.is_success());
        assert_eq!(machine.state(), AutomationState::Idle);
        assert_eq!(dispatcher.actions().last(), Some(&Action::Back));
        assert!(!dispatcher
            .actions()
            .iter()
            .any(|action| matches!(action, Action::Click(_))));
    }

    #[test]
    fn test_missing_force_stop_reports_control_not_found() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();

        let empty = ScreenNotification::new(
            ScreenKind::AppDetails,
            ControlNode::container("root", vec![ControlNode::button("x", "Open")]),
        );
        let report = machine.on_screen_notification(&empty, t0).unwrap();
        assert_eq!(
            report.result,
            Err(FreezeError::ControlNotFound {
                control: "force stop".into()
            })
        );
        assert_eq!(machine.state(), AutomationState::Idle);
    }

    #[test]
    fn test_rejected_clicks_count_as_not_found() {
        let (mut machine, dispatcher) = machine();
        dispatcher.reject_clicks(true);
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();

        let report = machine.on_screen_notification(&app_details(), t0).unwrap();
        assert!(matches!(
            report.result,
            Err(FreezeError::ControlNotFound { .. })
        ));
    }

    #[test]
    fn test_confirm_falls_back_to_force_stop_label() {
        let (mut machine, dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();
        machine.on_screen_notification(&app_details(), t0);

        let quirky = ScreenNotification::new(
            ScreenKind::ConfirmDialog,
            ControlNode::container(
                "dialog",
                vec![
                    ControlNode::button("cancel", "Cancel"),
                    ControlNode::button("confirm", "Force stop"),
                ],
            ),
        );
        assert!(machine.on_screen_notification(&quirky, t0).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingDismiss);
        assert_eq!(
            dispatcher.actions().last(),
            Some(&Action::Click("confirm".into()))
        );
    }

    #[test]
    fn test_missing_confirm_reports_control_not_found() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();
        machine.on_screen_notification(&app_details(), t0);

        let dialog = ScreenNotification::new(
            ScreenKind::ConfirmDialog,
            ControlNode::container("dialog", vec![ControlNode::button("c", "Cancel")]),
        );
        let report = machine.on_screen_notification(&dialog, t0).unwrap();
        assert_eq!(
            report.result,
            Err(FreezeError::ControlNotFound {
                control: "OK".into()
            })
        );
    }

    #[test]
    fn test_unexpected_screen_ignored_until_stale() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();

        let early = t0 + Duration::from_secs(2);
        assert!(machine.on_screen_notification(&other_screen(), early).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingStopScreen);

        // The expected screen can still arrive after a stray one.
        assert!(machine.on_screen_notification(&app_details(), early).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingConfirmScreen);

        let late = early + Duration::from_secs(9);
        let report = machine.on_screen_notification(&other_screen(), late).unwrap();
        assert_eq!(
            report.result,
            Err(FreezeError::UnexpectedScreen {
                screen: "com.example.Launcher".into()
            })
        );
        assert_eq!(machine.state(), AutomationState::Idle);
    }

    #[test]
    fn test_timeout_only_after_deadline() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();

        assert!(machine.on_timeout(t0 + Duration::from_secs(3)).is_none());
        assert_eq!(machine.state(), AutomationState::AwaitingStopScreen);

        let report = machine.on_timeout(t0 + Duration::from_secs(4)).unwrap();
        assert_eq!(report, AttemptReport::failure("app1", FreezeError::Timeout));
        assert_eq!(machine.state(), AutomationState::Idle);
        assert!(machine.on_timeout(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_each_action_rearms_timeout() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();

        let t1 = t0 + Duration::from_secs(3);
        machine.on_screen_notification(&app_details(), t1);
        assert_eq!(machine.deadline(), Some(t1 + Duration::from_secs(4)));
        assert!(machine.on_timeout(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_notifications_while_idle_are_ignored() {
        let (mut machine, dispatcher) = machine();
        assert!(machine
            .on_screen_notification(&app_details(), Instant::now())
            .is_none());
        assert_eq!(machine.state(), AutomationState::Idle);
        assert!(dispatcher.actions().is_empty());
    }

    #[test]
    fn test_abort_resets_without_report() {
        let (mut machine, _dispatcher) = machine();
        let t0 = Instant::now();
        machine.start("app1", t0).unwrap();
        machine.on_screen_notification(&app_details(), t0);

        assert_eq!(machine.abort(), Some("app1".into()));
        assert_eq!(machine.state(), AutomationState::Idle);
        assert_eq!(machine.deadline(), None);
        assert!(machine.on_timeout(t0 + Duration::from_secs(60)).is_none());
        assert_eq!(machine.abort(), None);
    }

    #[test]
    fn test_failed_screen_request_leaves_machine_idle() {
        let (mut machine, dispatcher) = machine();
        dispatcher.fail_requests(true);

        let err = machine.start("app1", Instant::now()).unwrap_err();
        assert!(matches!(err, FreezeError::Host { .. }));
        assert_eq!(machine.state(), AutomationState::Idle);
    }
}
