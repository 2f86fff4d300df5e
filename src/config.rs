use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "HAZARD_GUARD";
const DEFAULT_SETTINGS_FILE: &str = "hazard_guard";

/// Top level settings, layered from defaults, an optional TOML file and
/// `HAZARD_GUARD__*` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: LogLevel,
    pub stabilizer: StabilizerSettings,
    pub output: OutputSettings,
    pub pipeline: PipelineSettings,
    pub detection: DetectionSettings,
    pub audit: AuditSettings,
    pub replay: ReplaySettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Thresholds for the presence stabilizer and the arc latch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilizerSettings {
    /// A person last seen closer than this to the centerline is inside the frame.
    pub boundary_threshold: f64,
    pub lock_duration_secs: f64,
    pub presence_linger_secs: f64,
    pub arc_linger_secs: f64,
    /// Feed the anomaly lock into the actuator decision as well as the label.
    pub hold_actuator_during_lockout: bool,
}

impl Default for StabilizerSettings {
    fn default() -> Self {
        Self {
            boundary_threshold: 500.0,
            lock_duration_secs: 10.0,
            presence_linger_secs: 0.5,
            arc_linger_secs: 1.0,
            hold_actuator_during_lockout: false,
        }
    }
}

impl StabilizerSettings {
    pub fn lock_duration(&self) -> Duration {
        Duration::from_secs_f64(self.lock_duration_secs)
    }

    pub fn presence_linger(&self) -> Duration {
        Duration::from_secs_f64(self.presence_linger_secs)
    }

    pub fn arc_linger(&self) -> Duration {
        Duration::from_secs_f64(self.arc_linger_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub write_refresh_secs: f64,
    pub coil_address: u16,
    /// Upper bound for a single coil write, 0 disables the timeout.
    pub write_timeout_ms: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            write_refresh_secs: 1.0,
            coil_address: 1,
            write_timeout_ms: 100,
        }
    }
}

impl OutputSettings {
    pub fn write_refresh(&self) -> Duration {
        Duration::from_secs_f64(self.write_refresh_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Capacity of the acquisition -> control channel, in messages.
    pub frame_buffer_size: usize,
    pub actuator_buffer_size: usize,
    pub audit_buffer_size: usize,
    pub starvation_backoff_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            frame_buffer_size: 60,
            actuator_buffer_size: 10,
            audit_buffer_size: 64,
            starvation_backoff_ms: 5,
        }
    }
}

impl PipelineSettings {
    pub fn starvation_backoff(&self) -> Duration {
        Duration::from_millis(self.starvation_backoff_ms)
    }
}

/// Region of the image where detections are known false positives.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ExclusionZone {
    pub max_center_x: f64,
    pub max_center_y: f64,
    pub max_width: f64,
    pub max_height: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub person_confidence_threshold: f32,
    pub centerline_y: f64,
    /// Distances above the centerline are stretched by this factor.
    pub upper_scale: f64,
    pub no_person_distance: f64,
    pub exclusion_zones: Vec<ExclusionZone>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            person_confidence_threshold: 0.4,
            centerline_y: 600.0,
            upper_scale: 1.8,
            no_person_distance: 999.0,
            exclusion_zones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub path: PathBuf,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("log.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    pub path: PathBuf,
    pub frame_interval_ms: u64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("detections.jsonl"),
            frame_interval_ms: 25,
        }
    }
}

impl ReplaySettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Settings {
    /// Load settings from `path` (extension optional, missing file allowed)
    /// and the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(
                config::File::with_name(path.unwrap_or(DEFAULT_SETTINGS_FILE)).required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("stabilizer.lock_duration_secs", self.stabilizer.lock_duration_secs),
            ("stabilizer.presence_linger_secs", self.stabilizer.presence_linger_secs),
            ("stabilizer.arc_linger_secs", self.stabilizer.arc_linger_secs),
            ("output.write_refresh_secs", self.output.write_refresh_secs),
        ];
        for (field, value) in positive {
            match Duration::try_from_secs_f64(value) {
                Ok(duration) if !duration.is_zero() => {}
                _ => {
                    return Err(ConfigError::Invalid {
                        field,
                        reason: format!(
                            "must be a positive, representable number of seconds, got {}",
                            value
                        ),
                    });
                }
            }
        }

        if !self.stabilizer.boundary_threshold.is_finite() || self.stabilizer.boundary_threshold < 0.0
        {
            return Err(ConfigError::Invalid {
                field: "stabilizer.boundary_threshold",
                reason: "must be a non-negative distance".to_string(),
            });
        }

        // The absent-person sentinel has to read as "no constraint".
        if self.detection.no_person_distance < self.stabilizer.boundary_threshold {
            return Err(ConfigError::Invalid {
                field: "detection.no_person_distance",
                reason: format!(
                    "must be at least the boundary threshold ({})",
                    self.stabilizer.boundary_threshold
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.detection.person_confidence_threshold) {
            return Err(ConfigError::Invalid {
                field: "detection.person_confidence_threshold",
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        let capacities = [
            ("pipeline.actuator_buffer_size", self.pipeline.actuator_buffer_size),
            ("pipeline.audit_buffer_size", self.pipeline.audit_buffer_size),
        ];
        for (field, value) in capacities {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        // Each frame is handed off as two messages.
        if self.pipeline.frame_buffer_size < 2 {
            return Err(ConfigError::Invalid {
                field: "pipeline.frame_buffer_size",
                reason: "must hold at least one frame (2 messages)".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let settings = Settings::default();
        assert_eq!(settings.stabilizer.boundary_threshold, 500.0);
        assert_eq!(settings.stabilizer.lock_duration(), Duration::from_secs(10));
        assert_eq!(settings.stabilizer.presence_linger(), Duration::from_millis(500));
        assert_eq!(settings.stabilizer.arc_linger(), Duration::from_secs(1));
        assert_eq!(settings.output.write_refresh(), Duration::from_secs(1));
        assert!(!settings.stabilizer.hold_actuator_during_lockout);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_linger() {
        let mut settings = Settings::default();
        settings.stabilizer.presence_linger_secs = 0.0;
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "stabilizer.presence_linger_secs",
                ..
            }
        ));
    }

    #[test]
    fn rejects_durations_too_large_to_represent() {
        let mut settings = Settings::default();
        settings.stabilizer.lock_duration_secs = 1e20;
        let err = settings.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "stabilizer.lock_duration_secs",
                ..
            }
        ));

        let mut settings = Settings::default();
        settings.output.write_refresh_secs = f64::INFINITY;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_sentinel_below_boundary() {
        let mut settings = Settings::default();
        settings.detection.no_person_distance = 100.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_frame_buffer_too_small_for_a_frame() {
        let mut settings = Settings::default();
        settings.pipeline.frame_buffer_size = 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_timeout_disables_write_timeout() {
        let mut output = OutputSettings::default();
        assert_eq!(output.write_timeout(), Some(Duration::from_millis(100)));
        output.write_timeout_ms = 0;
        assert_eq!(output.write_timeout(), None);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let settings = Settings::load(Some("does-not-exist/hazard_guard_settings"))
            .expect("missing settings file is allowed");
        assert_eq!(settings.output.coil_address, 1);
        assert_eq!(settings.pipeline.frame_buffer_size, 60);
    }
}
