pub mod arc_latch;
pub mod controller;
pub mod frame_rate;
pub mod output;
pub mod presence;

pub use arc_latch::{ArcLatch, ArcState};
pub use controller::ControlLane;
pub use frame_rate::{FrameRate, FrameRateMeter};
pub use output::{HazardDecision, OutputCoordinator, OutputState};
pub use presence::{PresenceStabilizer, PresenceState};
