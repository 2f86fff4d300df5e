use crate::actuator::{ActuatorHandle, CoilCommand};
use crate::audit::{AuditEntry, AuditHandle};
use crate::common::{DetectionFrame, PipelineMessage};
use crate::config::Settings;
use crate::diagnostics::Diagnostics;
use crate::pipeline::arc_latch::ArcLatch;
use crate::pipeline::frame_rate::FrameRateMeter;
use crate::pipeline::output::OutputCoordinator;
use crate::pipeline::presence::PresenceStabilizer;
use crate::presentation::{PresentationSink, StatusRecord};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// The single control lane. Owns every piece of decision state, so none of
/// it is shared or locked; side effects leave through non-blocking handles.
pub struct ControlLane {
    presence: PresenceStabilizer,
    arc: ArcLatch,
    output: OutputCoordinator,
    frame_rate: FrameRateMeter,
    hold_actuator_during_lockout: bool,
    coil_address: u16,
    actuator: ActuatorHandle,
    audit: AuditHandle,
    presenter: Box<dyn PresentationSink>,
    diagnostics: Arc<Diagnostics>,
}

impl ControlLane {
    pub fn new(
        settings: &Settings,
        started_at: Instant,
        actuator: ActuatorHandle,
        audit: AuditHandle,
        presenter: Box<dyn PresentationSink>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            presence: PresenceStabilizer::new(&settings.stabilizer, started_at),
            arc: ArcLatch::new(&settings.stabilizer, started_at),
            output: OutputCoordinator::new(settings.output.write_refresh(), started_at),
            frame_rate: FrameRateMeter::new(),
            hold_actuator_during_lockout: settings.stabilizer.hold_actuator_during_lockout,
            coil_address: settings.output.coil_address,
            actuator,
            audit,
            presenter,
            diagnostics,
        }
    }

    pub fn handle(&mut self, message: PipelineMessage) -> Option<StatusRecord> {
        match message {
            PipelineMessage::Display(frame) => {
                self.presenter.show_image(&frame);
                None
            }
            PipelineMessage::Detection(frame) => Some(self.process(&frame)),
        }
    }

    #[instrument(level = "trace", skip(self, frame), fields(frame_id = %frame.frame_id()))]
    pub fn process(&mut self, frame: &DetectionFrame) -> StatusRecord {
        let person = self.presence.update(frame);
        let arc = self.arc.update(frame);

        let person_hazard = person.raw_present
            || (self.hold_actuator_during_lockout && self.presence.is_locked());
        let decision = self
            .output
            .evaluate(person_hazard, arc.raw_present, frame.timestamp());

        if decision.should_write {
            let command = CoilCommand {
                address: self.coil_address,
                value: decision.hazard,
                frame_id: frame.frame_id(),
            };
            if let Err(e) = self.actuator.dispatch(command) {
                warn!(frame_id = %frame.frame_id(), "Actuator write not dispatched: {}", e);
            }
        }
        if decision.should_log {
            self.audit
                .record(AuditEntry::new(decision.hazard, frame.frame_id()));
        }

        let rate = self.frame_rate.record(frame.timestamp());
        let status = StatusRecord {
            frame_id: frame.frame_id(),
            fps: rate.instant,
            fps_smoothed: rate.smoothed,
            person_label: person.label,
            person_count: frame.person_count(),
            arc_label: arc.label,
            arclight_count: frame.arclight_count(),
            min_lateral_distance: frame.min_lateral_distance(),
            locked: self.presence.is_locked(),
            hazard: decision.hazard,
            diagnostics: self.diagnostics.snapshot(),
        };
        self.presenter.show_status(&status);
        status
    }

    /// Processes messages in arrival order until cancelled or the
    /// acquisition lane hangs up.
    pub async fn run(mut self, mut frame_rx: Receiver<PipelineMessage>, cancel_token: CancellationToken) {
        info!("Control lane starting");
        loop {
            let message = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                message = frame_rx.recv() => message,
            };
            match message {
                Some(message) => {
                    self.handle(message);
                }
                None => break,
            }
        }
        info!("Control lane stopped");
    }
}
