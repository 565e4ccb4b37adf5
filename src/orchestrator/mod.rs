pub mod controller;
pub mod signal;
pub mod state;

pub use controller::{FreezeOrchestrator, OrchestratorConfig};
pub use signal::ForegroundSignal;
pub use state::{order_for_freeze, OrchestratorState, Progress, SessionOutcome};
