use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputState {
    /// Mirrors the value most recently sent to the actuator.
    pub last_hazard_value: bool,
    pub last_write_instant: Instant,
}

/// What the control lane should do with the actuator and audit log for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardDecision {
    pub hazard: bool,
    pub should_write: bool,
    pub should_log: bool,
}

/// Pure decision function over `OutputState`: edge-triggered writes with a
/// periodic refresh, and edge-triggered audit entries. Performs no I/O.
#[derive(Debug)]
pub struct OutputCoordinator {
    write_refresh: Duration,
    state: OutputState,
}

impl OutputCoordinator {
    pub fn new(write_refresh: Duration, started_at: Instant) -> Self {
        Self {
            write_refresh,
            state: OutputState {
                last_hazard_value: false,
                last_write_instant: started_at,
            },
        }
    }

    pub fn evaluate(&mut self, person_raw: bool, arc_raw: bool, now: Instant) -> HazardDecision {
        let hazard = person_raw || arc_raw;
        let transition = hazard != self.state.last_hazard_value;
        let refresh_due =
            now.saturating_duration_since(self.state.last_write_instant) > self.write_refresh;

        let should_write = transition || refresh_due;
        if should_write {
            self.state.last_write_instant = now;
        }
        if transition {
            self.state.last_hazard_value = hazard;
        }

        HazardDecision {
            hazard,
            should_write,
            should_log: transition,
        }
    }

    pub fn state(&self) -> &OutputState {
        &self.state
    }
}
