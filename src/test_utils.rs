//! Shared test doubles for the host surface.
//!
//! `RecordingDispatcher` logs every synthetic action. Once scripted with a
//! notification sink it also plays the host: opening a details screen, showing
//! the confirm dialog after "force stop" and returning to details after "OK".

#![cfg(test)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};

use crate::automation::NotificationSink;
use crate::host::{
    ActionDispatcher, ControlId, ControlNode, InventorySource, ScreenKind, ScreenNotification,
};
use crate::models::{Application, UsageSample};
use crate::orchestrator::ForegroundSignal;

pub fn app_details() -> ScreenNotification {
    ScreenNotification::new(
        ScreenKind::AppDetails,
        ControlNode::container(
            "details",
            vec![
                ControlNode::button("uninstall", "Uninstall"),
                ControlNode::button("force-stop", "FORCE STOP")
                    .with_view_id("com.android.settings:id/right_button"),
            ],
        ),
    )
}

pub fn app_details_stopped() -> ScreenNotification {
    ScreenNotification::new(
        ScreenKind::AppDetails,
        ControlNode::container(
            "details",
            vec![
                ControlNode::button("uninstall", "Uninstall"),
                ControlNode::button("force-stop", "FORCE STOP").disabled(),
            ],
        ),
    )
}

pub fn app_details_without_force_stop() -> ScreenNotification {
    ScreenNotification::new(
        ScreenKind::AppDetails,
        ControlNode::container("details", vec![ControlNode::button("uninstall", "Uninstall")]),
    )
}

pub fn confirm_dialog() -> ScreenNotification {
    ScreenNotification::new(
        ScreenKind::ConfirmDialog,
        ControlNode::container(
            "dialog",
            vec![
                ControlNode::button("cancel", "Cancel"),
                ControlNode::button("ok", "OK"),
            ],
        ),
    )
}

pub fn other_screen() -> ScreenNotification {
    ScreenNotification::new(
        ScreenKind::Other("com.example.Launcher".into()),
        ControlNode::container("home", Vec::new()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RequestScreen(String),
    Click(String),
    Back,
}

#[derive(Default)]
pub struct RecordingDispatcher {
    actions: Mutex<Vec<Action>>,
    reject_clicks: AtomicBool,
    fail_requests: AtomicBool,
    script: Mutex<Option<NotificationSink>>,
    foreground: Mutex<Option<ForegroundSignal>>,
    broken: Mutex<HashMap<String, u32>>,
}

impl RecordingDispatcher {
    /// Plays the host screens through `sink` in response to actions.
    pub fn script(&self, sink: NotificationSink) {
        *self.script.lock().unwrap() = Some(sink);
    }

    /// Pauses `signal` when a management screen opens, resumes it on back.
    pub fn attach_foreground(&self, signal: ForegroundSignal) {
        *self.foreground.lock().unwrap() = Some(signal);
    }

    /// The next `times` screens opened for `application_id` lack a force-stop button.
    pub fn break_app(&self, application_id: &str, times: u32) {
        self.broken
            .lock()
            .unwrap()
            .insert(application_id.to_string(), times);
    }

    pub fn reject_clicks(&self, reject: bool) {
        self.reject_clicks.store(reject, Ordering::SeqCst);
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn requested(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::RequestScreen(id) => Some(id),
                Action::Click(_) | Action::Back => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }

    fn play(&self, notification: ScreenNotification) {
        if let Some(sink) = self.script.lock().unwrap().as_ref() {
            sink.deliver(notification);
        }
    }

    fn take_breakage(&self, application_id: &str) -> bool {
        let mut broken = self.broken.lock().unwrap();
        match broken.get_mut(application_id) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

impl ActionDispatcher for RecordingDispatcher {
    fn dispatch_click(&self, control: &ControlId) -> bool {
        self.record(Action::Click(control.as_str().to_string()));
        if self.reject_clicks.load(Ordering::SeqCst) {
            return false;
        }
        match control.as_str() {
            "force-stop" => self.play(confirm_dialog()),
            "ok" => self.play(app_details_stopped()),
            _ => {}
        }
        true
    }

    fn navigate_back(&self) {
        self.record(Action::Back);
        if let Some(signal) = self.foreground.lock().unwrap().as_ref() {
            signal.resumed();
        }
    }

    fn request_management_screen(&self, application_id: &str) -> Result<()> {
        self.record(Action::RequestScreen(application_id.to_string()));
        if self.fail_requests.load(Ordering::SeqCst) {
            bail!("activity not found");
        }
        if let Some(signal) = self.foreground.lock().unwrap().as_ref() {
            signal.paused();
        }
        if self.take_breakage(application_id) {
            self.play(app_details_without_force_stop());
        } else {
            self.play(app_details());
        }
        Ok(())
    }
}

pub struct FakeInventory {
    apps: Mutex<Vec<Application>>,
    usage: HashMap<String, UsageSample>,
    launcher: Option<String>,
    usage_available: bool,
}

impl FakeInventory {
    pub fn new(apps: Vec<Application>) -> Self {
        Self {
            apps: Mutex::new(apps),
            usage: HashMap::new(),
            launcher: None,
            usage_available: true,
        }
    }

    pub fn with_launcher(mut self, launcher: &str) -> Self {
        self.launcher = Some(launcher.to_string());
        self
    }

    pub fn with_usage(mut self, application_id: &str, foreground_secs: u64) -> Self {
        self.usage.insert(
            application_id.to_string(),
            UsageSample {
                application_id: application_id.to_string(),
                foreground_time: Duration::from_secs(foreground_secs),
                last_time_used: None,
            },
        );
        self
    }

    pub fn without_usage_stats(mut self) -> Self {
        self.usage_available = false;
        self
    }

    pub fn set_running(&self, application_id: &str, running: bool) {
        for app in self.apps.lock().unwrap().iter_mut() {
            if app.id == application_id {
                app.is_running = running;
            }
        }
    }
}

impl InventorySource for FakeInventory {
    fn list_applications(&self) -> Result<Vec<Application>> {
        Ok(self.apps.lock().unwrap().clone())
    }

    fn usage_sample(&self, application_id: &str, _window: Duration) -> Option<UsageSample> {
        if !self.usage_available {
            return None;
        }
        self.usage.get(application_id).cloned()
    }

    fn usage_stats_available(&self) -> bool {
        self.usage_available
    }

    fn launcher_id(&self) -> Option<String> {
        self.launcher.clone()
    }
}
