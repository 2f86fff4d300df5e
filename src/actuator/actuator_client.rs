use crate::actuator::coil_service::{BoxCoilService, CoilCommand, classify_error};
use crate::diagnostics::Diagnostics;
use crate::error::ActuatorError;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};

/// Owns the actuator connection. Writes are applied one at a time, in the
/// order the control lane dispatched them.
pub struct ActuatorClient {
    command_rx: Receiver<CoilCommand>,
    service: BoxCoilService,
    diagnostics: Arc<Diagnostics>,
}

/// Control lane side of the actuator. Dispatch never waits on the fieldbus.
#[derive(Debug, Clone)]
pub struct ActuatorHandle {
    command_tx: Sender<CoilCommand>,
    diagnostics: Arc<Diagnostics>,
}

impl ActuatorHandle {
    pub fn dispatch(&self, command: CoilCommand) -> Result<(), ActuatorError> {
        match self.command_tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => {
                self.diagnostics.record_actuator_failure();
                Err(ActuatorError::Backlogged(command.address))
            }
            Err(TrySendError::Closed(_)) => {
                self.diagnostics.record_actuator_failure();
                Err(ActuatorError::ChannelClosed)
            }
        }
    }
}

impl ActuatorClient {
    pub fn new(
        service: BoxCoilService,
        capacity: usize,
        diagnostics: Arc<Diagnostics>,
    ) -> (Self, ActuatorHandle) {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        (
            Self {
                command_rx,
                service,
                diagnostics: diagnostics.clone(),
            },
            ActuatorHandle {
                command_tx,
                diagnostics,
            },
        )
    }

    /// Runs until cancelled or every handle has been dropped.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Actuator client starting");
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                command = self.command_rx.recv() => command,
            };
            match command {
                Some(command) => self.apply(command).await,
                None => break,
            }
        }
        info!("Actuator client stopped");
    }

    async fn apply(&mut self, command: CoilCommand) {
        let result = match self.service.ready().await {
            Ok(service) => service.call(command).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!(
                frame_id = %command.frame_id,
                address = command.address,
                value = command.value,
                "Coil written"
            ),
            Err(e) => {
                // No retry here; the next refresh write re-sends the value.
                let error = classify_error(e, command.address);
                warn!(frame_id = %command.frame_id, "Actuator write failed: {}", error);
                self.diagnostics.record_actuator_failure();
            }
        }
    }
}
