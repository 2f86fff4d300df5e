use tokio::time::Instant;

const ALPHA: f32 = 0.1; // EWMA smoothing factor

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameRate {
    pub instant: f32,
    pub smoothed: f32,
}

/// Frame rate from the spacing of consecutive detection frames.
#[derive(Debug, Default)]
pub struct FrameRateMeter {
    last_frame: Option<Instant>,
    rate: FrameRate,
}

impl FrameRateMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: Instant) -> FrameRate {
        if let Some(last) = self.last_frame.replace(at) {
            let elapsed = at.saturating_duration_since(last).as_secs_f32();
            self.rate.instant = if elapsed > 0.0 { 1.0 / elapsed } else { 0.0 };
            self.rate.smoothed = if self.rate.smoothed == 0.0 {
                self.rate.instant
            } else {
                self.rate.smoothed * (1.0 - ALPHA) + self.rate.instant * ALPHA
            };
        }
        self.rate
    }
}
