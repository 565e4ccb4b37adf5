pub mod classifier;
pub mod config;
pub mod pending;

pub use classifier::EligibilityClassifier;
pub use config::EligibilityConfig;
pub use pending::{apps_pending_freeze, list_candidates};
