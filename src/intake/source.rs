use crate::error::IntakeError;
use crate::intake::aggregator::{Detection, DetectionAggregator};
use crate::intake::record::DetectionRecord;
use async_trait::async_trait;
use image::DynamicImage;

/// One frame's worth of output from a detection source, not yet validated.
#[derive(Debug)]
pub struct SourceFrame {
    pub image: Option<DynamicImage>,
    pub record: Result<DetectionRecord, IntakeError>,
}

#[derive(Debug)]
pub enum SourceEvent {
    Frame(SourceFrame),
    /// Nothing available this cycle, try again later.
    Starved,
    Closed,
}

/// Anything that yields per-frame detection summaries.
#[async_trait]
pub trait DetectionSource: Send {
    async fn next(&mut self) -> SourceEvent;
}

pub enum Capture {
    Image(DynamicImage),
    Starved,
    Closed,
}

/// Camera or stream the detector reads from.
#[async_trait]
pub trait FrameSource: Send {
    async fn capture(&mut self) -> Capture;
}

#[derive(Debug, Default)]
pub struct DetectorOutput {
    /// Image with boxes drawn, if the detector renders one.
    pub annotated: Option<DynamicImage>,
    pub detections: Vec<Detection>,
}

/// The object detector. Opaque to the rest of the crate.
#[async_trait]
pub trait Detector: Send {
    async fn detect(&mut self, image: &DynamicImage) -> Result<DetectorOutput, IntakeError>;
}

/// Runs captured frames through a detector and reduces the boxes.
pub struct InferenceSource<F, D> {
    frames: F,
    detector: D,
    aggregator: DetectionAggregator,
}

impl<F, D> InferenceSource<F, D>
where
    F: FrameSource,
    D: Detector,
{
    pub fn new(frames: F, detector: D, aggregator: DetectionAggregator) -> Self {
        Self {
            frames,
            detector,
            aggregator,
        }
    }
}

#[async_trait]
impl<F, D> DetectionSource for InferenceSource<F, D>
where
    F: FrameSource,
    D: Detector,
{
    async fn next(&mut self) -> SourceEvent {
        let image = match self.frames.capture().await {
            Capture::Image(image) => image,
            Capture::Starved => return SourceEvent::Starved,
            Capture::Closed => return SourceEvent::Closed,
        };

        let frame = match self.detector.detect(&image).await {
            Ok(output) => SourceFrame {
                record: Ok(self.aggregator.aggregate(&output.detections)),
                image: Some(output.annotated.unwrap_or(image)),
            },
            Err(e) => SourceFrame {
                image: None,
                record: Err(e),
            },
        };
        SourceEvent::Frame(frame)
    }
}
