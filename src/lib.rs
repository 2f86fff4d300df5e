pub mod actuator;
pub mod audit;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod presentation;

pub use config::Settings;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{ActuatorError, AppError, ConfigError, IntakeError};
