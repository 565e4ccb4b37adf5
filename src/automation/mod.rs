pub mod config;
pub mod controller;
pub mod lookup;
pub mod machine;
pub mod state;

pub use config::AutomationConfig;
pub use controller::{AttemptTicket, AutomationHandle, NotificationSink};
pub use lookup::ControlLookup;
pub use machine::AutomationMachine;
pub use state::{AttemptReport, AutomationState};
