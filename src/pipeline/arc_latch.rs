use crate::common::{DetectionFrame, Label, SignalReading};
use crate::config::StabilizerSettings;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcState {
    pub last_seen_instant: Instant,
}

/// Short-memory latch for arc-light flashes. The label decays to absent once
/// no flash has been seen for longer than the linger window.
#[derive(Debug)]
pub struct ArcLatch {
    linger: Duration,
    state: ArcState,
    label: Label,
}

impl ArcLatch {
    pub fn new(settings: &StabilizerSettings, started_at: Instant) -> Self {
        Self {
            linger: settings.arc_linger(),
            state: ArcState {
                last_seen_instant: started_at,
            },
            label: Label::Absent,
        }
    }

    pub fn update(&mut self, frame: &DetectionFrame) -> SignalReading {
        let now = frame.timestamp();

        if frame.arclight_present() {
            self.state.last_seen_instant = now;
            self.label = Label::Present;
            return SignalReading {
                label: self.label,
                raw_present: true,
            };
        }

        if now.saturating_duration_since(self.state.last_seen_instant) > self.linger {
            self.label = Label::Absent;
        }

        SignalReading {
            label: self.label,
            raw_present: false,
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn state(&self) -> &ArcState {
        &self.state
    }
}
