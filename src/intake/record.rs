use crate::common::DetectionFrame;
use crate::error::IntakeError;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

/// Detection summary as it arrives from a detector or a replay file. Fields
/// are optional here so that incomplete records can be rejected at the
/// boundary instead of failing deserialization silently upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    #[serde(alias = "person_num")]
    pub person_count: Option<u32>,
    #[serde(alias = "arclight_num")]
    pub arclight_count: Option<u32>,
    #[serde(alias = "min_distance")]
    pub min_lateral_distance: Option<f64>,
}

impl DetectionRecord {
    pub fn new(person_count: u32, arclight_count: u32, min_lateral_distance: f64) -> Self {
        Self {
            person_count: Some(person_count),
            arclight_count: Some(arclight_count),
            min_lateral_distance: Some(min_lateral_distance),
        }
    }

    /// Validate and stamp the record. The presence flags of the resulting
    /// frame are derived from the counts.
    pub fn into_frame(self, frame_id: Uuid, timestamp: Instant) -> Result<DetectionFrame, IntakeError> {
        let person_count = self
            .person_count
            .ok_or(IntakeError::MissingField("person_count"))?;
        let arclight_count = self
            .arclight_count
            .ok_or(IntakeError::MissingField("arclight_count"))?;
        let min_lateral_distance = self
            .min_lateral_distance
            .ok_or(IntakeError::MissingField("min_lateral_distance"))?;

        if !min_lateral_distance.is_finite() || min_lateral_distance < 0.0 {
            return Err(IntakeError::InvalidValue {
                field: "min_lateral_distance",
                value: min_lateral_distance,
            });
        }

        Ok(DetectionFrame::new(
            frame_id,
            person_count,
            arclight_count,
            min_lateral_distance,
            timestamp,
        ))
    }
}
