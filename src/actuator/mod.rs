pub mod actuator_client;
pub mod coil_service;

pub use actuator_client::{ActuatorClient, ActuatorHandle};
pub use coil_service::{
    BoxCoilService, CoilCommand, CoilService, CoilServiceBuilder, CoilWriter, SimulatedCoil,
};
