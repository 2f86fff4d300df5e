use crate::common::{DisplayFrame, PipelineMessage};
use crate::diagnostics::Diagnostics;
use crate::intake::source::{DetectionSource, SourceEvent, SourceFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Messages handed to the control lane per frame.
const MESSAGES_PER_FRAME: usize = 2;

/// Producer side of the pipeline: pulls frames from the source, validates
/// them and hands each one to the control lane as a display message followed
/// by a detection message.
///
/// The channel is the only buffer. When it cannot take a whole frame the
/// newest frame is dropped, never half of one.
pub struct AcquisitionLane<S> {
    source: S,
    frame_tx: Sender<PipelineMessage>,
    diagnostics: Arc<Diagnostics>,
    starvation_backoff: Duration,
}

impl<S> AcquisitionLane<S>
where
    S: DetectionSource,
{
    pub fn new(
        source: S,
        frame_tx: Sender<PipelineMessage>,
        diagnostics: Arc<Diagnostics>,
        starvation_backoff: Duration,
    ) -> Self {
        Self {
            source,
            frame_tx,
            diagnostics,
            starvation_backoff,
        }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Acquisition lane starting");
        loop {
            // A frame still being produced when the stop arrives is discarded.
            let event = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                event = self.source.next() => event,
            };

            match event {
                SourceEvent::Frame(frame) => {
                    if !self.forward(frame) {
                        break;
                    }
                }
                SourceEvent::Starved => {
                    self.diagnostics.record_starved();
                    tokio::select! {
                        biased;
                        _ = cancel_token.cancelled() => break,
                        _ = tokio::time::sleep(self.starvation_backoff) => {}
                    }
                }
                SourceEvent::Closed => {
                    info!("Detection source closed");
                    break;
                }
            }
        }
        info!("Acquisition lane stopped");
    }

    /// Returns false once the control lane has gone away.
    fn forward(&mut self, frame: SourceFrame) -> bool {
        let frame_id = Uuid::new_v4();
        let detection = match frame
            .record
            .and_then(|record| record.into_frame(frame_id, Instant::now()))
        {
            Ok(detection) => detection,
            Err(e) => {
                warn!(%frame_id, "Rejecting malformed detection frame: {}", e);
                self.diagnostics.record_rejected();
                return true;
            }
        };

        match self.frame_tx.try_reserve_many(MESSAGES_PER_FRAME) {
            Ok(mut permits) => {
                if let Some(permit) = permits.next() {
                    permit.send(PipelineMessage::Display(DisplayFrame::new(
                        frame_id,
                        frame.image,
                    )));
                }
                if let Some(permit) = permits.next() {
                    permit.send(PipelineMessage::Detection(detection));
                }
                debug!(%frame_id, "Frame handed to control lane");
                true
            }
            Err(TrySendError::Full(_)) => {
                // Drop frame to keep real-time
                warn!(%frame_id, "Dropping frame: channel full");
                self.diagnostics.record_dropped();
                true
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Frame channel closed, stopping acquisition lane");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeError;
    use crate::intake::record::DetectionRecord;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::mpsc;

    struct ScriptedSource {
        events: VecDeque<SourceEvent>,
    }

    impl ScriptedSource {
        fn new(events: Vec<SourceEvent>) -> Self {
            Self {
                events: events.into(),
            }
        }
    }

    #[async_trait]
    impl DetectionSource for ScriptedSource {
        async fn next(&mut self) -> SourceEvent {
            self.events.pop_front().unwrap_or(SourceEvent::Closed)
        }
    }

    struct EndlessSource;

    #[async_trait]
    impl DetectionSource for EndlessSource {
        async fn next(&mut self) -> SourceEvent {
            tokio::time::sleep(Duration::from_millis(20)).await;
            frame(DetectionRecord::new(0, 0, 999.0))
        }
    }

    fn frame(record: DetectionRecord) -> SourceEvent {
        SourceEvent::Frame(SourceFrame {
            image: None,
            record: Ok(record),
        })
    }

    fn lane<S: DetectionSource>(
        source: S,
        capacity: usize,
    ) -> (
        AcquisitionLane<S>,
        mpsc::Receiver<PipelineMessage>,
        Arc<Diagnostics>,
    ) {
        let (tx, rx) = mpsc::channel(capacity);
        let diagnostics = Arc::new(Diagnostics::new());
        (
            AcquisitionLane::new(source, tx, diagnostics.clone(), Duration::from_millis(1)),
            rx,
            diagnostics,
        )
    }

    #[tokio::test]
    async fn frames_arrive_as_display_then_detection_in_order() {
        let source = ScriptedSource::new(vec![
            frame(DetectionRecord::new(1, 0, 100.0)),
            SourceEvent::Starved,
            frame(DetectionRecord::new(0, 1, 999.0)),
        ]);
        let (lane, mut rx, diagnostics) = lane(source, 8);
        lane.run(CancellationToken::new()).await;

        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        assert_eq!(messages.len(), 4);

        let mut last_timestamp = None;
        for pair in messages.chunks(2) {
            match (&pair[0], &pair[1]) {
                (PipelineMessage::Display(display), PipelineMessage::Detection(detection)) => {
                    assert_eq!(display.frame_id(), detection.frame_id());
                    if let Some(previous) = last_timestamp {
                        assert!(detection.timestamp() >= previous);
                    }
                    last_timestamp = Some(detection.timestamp());
                }
                _ => panic!("messages out of order"),
            }
        }
        assert_eq!(diagnostics.snapshot().source_starved, 1);
    }

    #[tokio::test]
    async fn malformed_records_never_reach_the_channel() {
        let source = ScriptedSource::new(vec![
            SourceEvent::Frame(SourceFrame {
                image: None,
                record: Err(IntakeError::Detector("boom".to_string())),
            }),
            frame(DetectionRecord {
                person_count: Some(1),
                arclight_count: None,
                min_lateral_distance: Some(10.0),
            }),
            frame(DetectionRecord::new(0, 0, 999.0)),
        ]);
        let (lane, mut rx, diagnostics) = lane(source, 8);
        lane.run(CancellationToken::new()).await;

        assert!(matches!(rx.recv().await, Some(PipelineMessage::Display(_))));
        assert!(matches!(rx.recv().await, Some(PipelineMessage::Detection(_))));
        assert!(rx.recv().await.is_none());
        assert_eq!(diagnostics.snapshot().frames_rejected, 2);
    }

    #[tokio::test]
    async fn full_channel_drops_whole_newest_frame() {
        let source = ScriptedSource::new(vec![
            frame(DetectionRecord::new(1, 0, 100.0)),
            frame(DetectionRecord::new(0, 0, 999.0)),
        ]);
        // Room for one and a half frames.
        let (lane, mut rx, diagnostics) = lane(source, 3);
        lane.run(CancellationToken::new()).await;

        let first = rx.recv().await;
        let second = rx.recv().await;
        assert!(matches!(first, Some(PipelineMessage::Display(_))));
        match second {
            Some(PipelineMessage::Detection(detection)) => assert!(detection.person_present()),
            other => panic!("expected the first detection, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(diagnostics.snapshot().frames_dropped, 1);
    }

    #[tokio::test]
    async fn closed_channel_stops_the_lane() {
        let (lane, rx, _diagnostics) = lane(EndlessSource, 4);
        drop(rx);
        tokio::time::timeout(Duration::from_secs(1), lane.run(CancellationToken::new()))
            .await
            .expect("lane stops when the control lane is gone");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_an_endless_source() {
        let (lane, mut rx, _diagnostics) = lane(EndlessSource, 64);
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(lane.run(cancel_token.clone()));

        tokio::time::sleep(Duration::from_millis(105)).await;
        cancel_token.cancel();
        handle.await.expect("lane task panicked");

        let mut count = 0;
        while let Ok(message) = rx.try_recv() {
            if matches!(message, PipelineMessage::Detection(_)) {
                count += 1;
            }
        }
        assert_eq!(count, 5);
    }
}
