use crate::error::IntakeError;
use crate::intake::record::DetectionRecord;
use crate::intake::source::{DetectionSource, SourceEvent, SourceFrame};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info};

/// Replays recorded detection summaries, one JSON object per line, at a
/// fixed frame interval.
pub struct ReplaySource<R> {
    lines: Lines<BufReader<R>>,
    ticker: Interval,
}

impl ReplaySource<File> {
    pub async fn open(path: impl AsRef<Path>, frame_interval: Duration) -> Result<Self, IntakeError> {
        let file = File::open(path.as_ref()).await?;
        info!("Replaying detections from {}", path.as_ref().display());
        Ok(Self::new(file, frame_interval))
    }
}

impl<R> ReplaySource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Must be called from within a tokio runtime.
    pub fn new(reader: R, frame_interval: Duration) -> Self {
        let mut ticker = tokio::time::interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            lines: BufReader::new(reader).lines(),
            ticker,
        }
    }
}

#[async_trait]
impl<R> DetectionSource for ReplaySource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next(&mut self) -> SourceEvent {
        self.ticker.tick().await;
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let record = serde_json::from_str::<DetectionRecord>(&line)
                        .map_err(IntakeError::from);
                    return SourceEvent::Frame(SourceFrame {
                        image: None,
                        record,
                    });
                }
                Ok(None) => return SourceEvent::Closed,
                Err(e) => {
                    error!("Failed to read replay input: {}", e);
                    return SourceEvent::Closed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_lines_and_flags_garbage() {
        let input = concat!(
            r#"{"person_count": 1, "arclight_count": 0, "min_lateral_distance": 250.0}"#,
            "\n\n",
            "not json\n",
            r#"{"person_count": 0, "arclight_count": 2, "min_lateral_distance": 999}"#,
            "\n",
        );
        let mut source = ReplaySource::new(input.as_bytes(), Duration::from_millis(1));

        match source.next().await {
            SourceEvent::Frame(frame) => {
                assert_eq!(frame.record.unwrap(), DetectionRecord::new(1, 0, 250.0));
            }
            other => panic!("expected a frame, got {:?}", other),
        }
        match source.next().await {
            SourceEvent::Frame(frame) => {
                assert!(matches!(frame.record, Err(IntakeError::Parse(_))));
            }
            other => panic!("expected a frame, got {:?}", other),
        }
        match source.next().await {
            SourceEvent::Frame(frame) => {
                assert_eq!(frame.record.unwrap(), DetectionRecord::new(0, 2, 999.0));
            }
            other => panic!("expected a frame, got {:?}", other),
        }
        assert!(matches!(source.next().await, SourceEvent::Closed));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = ReplaySource::open("no/such/replay.jsonl", Duration::from_millis(25)).await;
        assert!(matches!(result, Err(IntakeError::Read(_))));
    }
}
