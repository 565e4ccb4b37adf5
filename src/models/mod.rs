pub mod application;

pub use application::{Application, FreezeMode, FreezeStatus, UsageSample};
