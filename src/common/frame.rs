use image::DynamicImage;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

/// Per-frame detection outcome handed to the control lane. Built only by
/// validating a `DetectionRecord`, so the presence flags always agree with
/// the counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFrame {
    frame_id: Uuid,
    person_count: u32,
    arclight_count: u32,
    min_lateral_distance: f64,
    timestamp: Instant,
}

impl DetectionFrame {
    pub fn new(
        frame_id: Uuid,
        person_count: u32,
        arclight_count: u32,
        min_lateral_distance: f64,
        timestamp: Instant,
    ) -> Self {
        Self {
            frame_id,
            person_count,
            arclight_count,
            min_lateral_distance,
            timestamp,
        }
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn person_count(&self) -> u32 {
        self.person_count
    }

    pub fn person_present(&self) -> bool {
        self.person_count > 0
    }

    pub fn arclight_count(&self) -> u32 {
        self.arclight_count
    }

    pub fn arclight_present(&self) -> bool {
        self.arclight_count > 0
    }

    pub fn min_lateral_distance(&self) -> f64 {
        self.min_lateral_distance
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

/// Annotated image for the presentation layer. Cloning shares the buffer.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    frame_id: Uuid,
    image: Option<Arc<DynamicImage>>,
}

impl DisplayFrame {
    pub fn new(frame_id: Uuid, image: Option<DynamicImage>) -> Self {
        Self {
            frame_id,
            image: image.map(Arc::new),
        }
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn image(&self) -> Option<&Arc<DynamicImage>> {
        self.image.as_ref()
    }
}

/// The two messages the acquisition lane sends per frame, in this order.
#[derive(Debug, Clone)]
pub enum PipelineMessage {
    Display(DisplayFrame),
    Detection(DetectionFrame),
}
