pub mod frame;
pub mod label;

pub use frame::{DetectionFrame, DisplayFrame, PipelineMessage};
pub use label::{Label, SignalReading};
