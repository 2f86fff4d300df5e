use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Intake Error: {0}")]
    Intake(#[from] IntakeError),
    #[error("Actuator Error: {0}")]
    Actuator(#[from] ActuatorError),
    #[error("Audit log error: {0}")]
    Audit(std::io::Error),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
    #[error("Task failed to join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// Configuration Error Type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// Errors raised at the detection boundary. None of these reach the control lane.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Detection record is missing field '{0}'")]
    MissingField(&'static str),
    #[error("Detection record field '{field}' has invalid value {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("Failed to parse detection record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read detection source: {0}")]
    Read(#[from] std::io::Error),
    #[error("Detector failed: {0}")]
    Detector(String),
}

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Failed to write coil {address}: {reason}")]
    WriteFailed { address: u16, reason: String },
    #[error("Coil write to {address} timed out")]
    Timeout { address: u16 },
    #[error("Actuator channel is full, dropped write of coil {0}")]
    Backlogged(u16),
    #[error("Actuator channel closed")]
    ChannelClosed,
}
