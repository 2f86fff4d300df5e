use crate::actuator::{ActuatorClient, CoilServiceBuilder, CoilWriter};
use crate::audit::AuditLog;
use crate::config::Settings;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::error::AppError;
use crate::intake::{AcquisitionLane, DetectionSource};
use crate::pipeline::ControlLane;
use crate::presentation::{PresentationSink, TracingPresenter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Running pipeline: acquisition lane, control lane, actuator client and
/// audit writer, tied together by one cancellation token.
pub struct Coordinator {
    tasks: Vec<JoinHandle<()>>,
    cancel_token: CancellationToken,
    diagnostics: Arc<Diagnostics>,
}

impl Coordinator {
    async fn start<S>(
        settings: Settings,
        source: S,
        coil_writer: Arc<dyn CoilWriter>,
        presenter: Box<dyn PresentationSink>,
    ) -> Result<Self, AppError>
    where
        S: DetectionSource + 'static,
    {
        let cancel_token = CancellationToken::new();
        let diagnostics = Arc::new(Diagnostics::new());

        let (audit_log, audit_handle) = AuditLog::open(
            &settings.audit.path,
            settings.pipeline.audit_buffer_size,
            diagnostics.clone(),
        )
        .await?;
        let coil_service = CoilServiceBuilder::new(coil_writer)
            .write_timeout(settings.output.write_timeout())
            .build();
        let (actuator, actuator_handle) = ActuatorClient::new(
            coil_service,
            settings.pipeline.actuator_buffer_size,
            diagnostics.clone(),
        );

        let (frame_tx, frame_rx) = tokio::sync::mpsc::channel(settings.pipeline.frame_buffer_size);
        let acquisition = AcquisitionLane::new(
            source,
            frame_tx,
            diagnostics.clone(),
            settings.pipeline.starvation_backoff(),
        );
        let control = ControlLane::new(
            &settings,
            Instant::now(),
            actuator_handle,
            audit_handle,
            presenter,
            diagnostics.clone(),
        );

        let tasks = vec![
            tokio::spawn(acquisition.run(cancel_token.clone())),
            tokio::spawn(control.run(frame_rx, cancel_token.clone())),
            tokio::spawn(actuator.run(cancel_token.clone())),
            tokio::spawn({
                let cancel_token = cancel_token.clone();
                async move {
                    audit_log.run(cancel_token).await;
                }
            }),
        ];

        tracing::info!("Coordinator started");
        Ok(Self {
            tasks,
            cancel_token,
            diagnostics,
        })
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Wait for every lane to finish, either after `stop` or once the source
    /// closes and the pipeline drains. Returns the final counters.
    pub async fn join(mut self) -> Result<DiagnosticsSnapshot, AppError> {
        for task in self.tasks.drain(..) {
            task.await?;
        }
        let diagnostics = self.diagnostics.snapshot();
        tracing::info!(?diagnostics, "Coordinator stopped");
        Ok(diagnostics)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    coil_writer: Option<Arc<dyn CoilWriter>>,
    presenter: Option<Box<dyn PresentationSink>>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            coil_writer: None,
            presenter: None,
        }
    }

    // Overrides the boundary threshold from the settings.
    pub fn boundary_threshold(mut self, boundary_threshold: f64) -> Self {
        self.settings.stabilizer.boundary_threshold = boundary_threshold;
        self
    }

    pub fn lock_duration(mut self, lock_duration: Duration) -> Self {
        self.settings.stabilizer.lock_duration_secs = lock_duration.as_secs_f64();
        self
    }

    pub fn write_refresh(mut self, write_refresh: Duration) -> Self {
        self.settings.output.write_refresh_secs = write_refresh.as_secs_f64();
        self
    }

    pub fn hold_actuator_during_lockout(mut self, hold: bool) -> Self {
        self.settings.stabilizer.hold_actuator_during_lockout = hold;
        self
    }

    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.settings.pipeline.frame_buffer_size = frame_buffer_size;
        self
    }

    pub fn audit_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.audit.path = path.into();
        self
    }

    pub fn coil_writer(mut self, coil_writer: Arc<dyn CoilWriter>) -> Self {
        self.coil_writer = Some(coil_writer);
        self
    }

    pub fn presenter(mut self, presenter: Box<dyn PresentationSink>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Spawns the lanes onto the current runtime.
    pub async fn start<S>(self, source: S) -> Result<Coordinator, AppError>
    where
        S: DetectionSource + 'static,
    {
        self.settings.validate()?;
        let coil_writer = self
            .coil_writer
            .ok_or(AppError::Pipeline("Coil writer not set".to_string()))?;
        let presenter = self
            .presenter
            .unwrap_or_else(|| Box::new(TracingPresenter));
        Coordinator::start(self.settings, source, coil_writer, presenter).await
    }
}
