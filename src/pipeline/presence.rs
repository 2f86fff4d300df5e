use crate::common::{DetectionFrame, Label, SignalReading};
use crate::config::StabilizerSettings;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Distance that places no constraint on the next disappearance.
const UNCONSTRAINED_DISTANCE: f64 = f64::INFINITY;

/// Hysteresis and anomaly lockout state for the "person present" signal.
/// Owned by the control lane only.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceState {
    pub locked: bool,
    /// Only meaningful while `locked`.
    pub lock_expiry: Instant,
    pub last_seen_present_distance: f64,
    pub last_seen_instant: Instant,
}

impl PresenceState {
    pub fn new(started_at: Instant) -> Self {
        Self {
            locked: false,
            lock_expiry: started_at,
            last_seen_present_distance: UNCONSTRAINED_DISTANCE,
            last_seen_instant: started_at,
        }
    }
}

/// Turns per-frame person detections into a debounced label.
///
/// A person leaving through the image boundary is debounced over the linger
/// window. A person vanishing from the interior (last seen closer than
/// `boundary_threshold` to the centerline) locks the label for the lock
/// duration instead, holding the last hazardous state on the display. The
/// raw reading is never affected by the lock.
#[derive(Debug)]
pub struct PresenceStabilizer {
    boundary_threshold: f64,
    lock_duration: Duration,
    linger: Duration,
    state: PresenceState,
    label: Label,
}

impl PresenceStabilizer {
    pub fn new(settings: &StabilizerSettings, started_at: Instant) -> Self {
        Self {
            boundary_threshold: settings.boundary_threshold,
            lock_duration: settings.lock_duration(),
            linger: settings.presence_linger(),
            state: PresenceState::new(started_at),
            label: Label::Absent,
        }
    }

    /// Feed one frame. Frames must arrive in timestamp order.
    pub fn update(&mut self, frame: &DetectionFrame) -> SignalReading {
        let now = frame.timestamp();

        if frame.person_present() {
            self.state.last_seen_instant = now;
            self.state.last_seen_present_distance = frame.min_lateral_distance();
            self.label = Label::Present;
            return SignalReading {
                label: self.label,
                raw_present: true,
            };
        }

        let state = &mut self.state;
        if state.last_seen_present_distance < self.boundary_threshold && !state.locked {
            let last_distance = state.last_seen_present_distance;
            state.lock_expiry = now + self.lock_duration;
            state.locked = true;
            // The sighting is consumed by this lock. Only a new interior
            // sighting can lock again.
            state.last_seen_present_distance = UNCONSTRAINED_DISTANCE;
            warn!(
                frame_id = %frame.frame_id(),
                last_distance,
                "Person vanished away from the frame boundary, locking presence for {:?}",
                self.lock_duration
            );
        } else if !state.locked && now.saturating_duration_since(state.last_seen_instant) > self.linger
        {
            self.label = Label::Absent;
        } else if state.locked && now > state.lock_expiry {
            state.locked = false;
            info!(frame_id = %frame.frame_id(), "Presence lock expired");
        }

        SignalReading {
            label: self.label,
            raw_present: false,
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }
}
