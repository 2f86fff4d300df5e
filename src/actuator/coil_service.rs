use crate::error::ActuatorError;
use async_trait::async_trait;
use futures::Future;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service};
use uuid::Uuid;

/// Single-coil digital write primitive of the fieldbus client.
#[async_trait]
pub trait CoilWriter: Send + Sync {
    async fn write_coil(&self, address: u16, value: bool) -> Result<(), ActuatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoilCommand {
    pub address: u16,
    pub value: bool,
    pub frame_id: Uuid,
}

/// Stand-in for a PLC: logs each write and remembers the last value per coil.
#[derive(Debug, Default)]
pub struct SimulatedCoil {
    coils: Mutex<HashMap<u16, bool>>,
}

impl SimulatedCoil {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, address: u16) -> Option<bool> {
        self.coils
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address)
            .copied()
    }
}

#[async_trait]
impl CoilWriter for SimulatedCoil {
    async fn write_coil(&self, address: u16, value: bool) -> Result<(), ActuatorError> {
        tracing::info!(address, value, "Simulated coil write");
        self.coils
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address, value);
        Ok(())
    }
}

#[derive(Clone)]
pub struct CoilService {
    inner: Arc<dyn CoilWriter>,
}

impl CoilService {
    pub fn new(inner: Arc<dyn CoilWriter>) -> Self {
        Self { inner }
    }
}

impl Service<CoilCommand> for CoilService {
    type Response = ();
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, command: CoilCommand) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner
                .write_coil(command.address, command.value)
                .await
                .map_err(BoxError::from)
        })
    }
}

pub type BoxCoilService = BoxService<CoilCommand, (), BoxError>;

pub struct CoilServiceBuilder {
    writer: Arc<dyn CoilWriter>,
    write_timeout: Option<Duration>,
}

impl CoilServiceBuilder {
    pub fn new(writer: Arc<dyn CoilWriter>) -> Self {
        Self {
            writer,
            write_timeout: None,
        }
    }

    pub fn write_timeout(mut self, write_timeout: Option<Duration>) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    pub fn build(self) -> BoxCoilService {
        let service = ServiceBuilder::new()
            .option_layer(self.write_timeout.map(TimeoutLayer::new))
            .service(CoilService::new(self.writer));
        BoxService::new(service)
    }
}

/// Map a boxed service error back onto the actuator taxonomy.
pub fn classify_error(error: BoxError, address: u16) -> ActuatorError {
    if error.is::<tower::timeout::error::Elapsed>() {
        return ActuatorError::Timeout { address };
    }
    match error.downcast::<ActuatorError>() {
        Ok(actuator_error) => *actuator_error,
        Err(other) => ActuatorError::WriteFailed {
            address,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    struct StalledCoil;

    #[async_trait]
    impl CoilWriter for StalledCoil {
        async fn write_coil(&self, _address: u16, _value: bool) -> Result<(), ActuatorError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    struct RefusingCoil;

    #[async_trait]
    impl CoilWriter for RefusingCoil {
        async fn write_coil(&self, address: u16, _value: bool) -> Result<(), ActuatorError> {
            Err(ActuatorError::WriteFailed {
                address,
                reason: "connection refused".to_string(),
            })
        }
    }

    fn command(value: bool) -> CoilCommand {
        CoilCommand {
            address: 1,
            value,
            frame_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn simulated_coil_remembers_last_value() {
        let coil = Arc::new(SimulatedCoil::new());
        let mut service = CoilServiceBuilder::new(coil.clone()).build();

        service.ready().await.unwrap().call(command(true)).await.unwrap();
        assert_eq!(coil.value(1), Some(true));
        service.ready().await.unwrap().call(command(false)).await.unwrap();
        assert_eq!(coil.value(1), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_times_out() {
        let mut service = CoilServiceBuilder::new(Arc::new(StalledCoil))
            .write_timeout(Some(Duration::from_millis(100)))
            .build();

        let error = service
            .ready()
            .await
            .unwrap()
            .call(command(true))
            .await
            .unwrap_err();
        assert!(matches!(
            classify_error(error, 1),
            ActuatorError::Timeout { address: 1 }
        ));
    }

    #[tokio::test]
    async fn writer_error_survives_boxing() {
        let mut service = CoilServiceBuilder::new(Arc::new(RefusingCoil)).build();

        let error = service
            .ready()
            .await
            .unwrap()
            .call(command(true))
            .await
            .unwrap_err();
        match classify_error(error, 1) {
            ActuatorError::WriteFailed { address, reason } => {
                assert_eq!(address, 1);
                assert_eq!(reason, "connection refused");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
