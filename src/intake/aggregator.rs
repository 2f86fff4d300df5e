use crate::config::{DetectionSettings, ExclusionZone};
use crate::intake::record::DetectionRecord;
use serde::{Deserialize, Serialize};

pub const PERSON_CLASS: &str = "person";
pub const ARCLIGHT_CLASS: &str = "arclight";

/// Axis-aligned box in image pixels, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center_x(&self) -> f64 {
        0.5 * (self.x1 + self.x2)
    }

    pub fn center_y(&self) -> f64 {
        0.5 * (self.y1 + self.y2)
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }
}

/// One box reported by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class: impl Into<String>, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class: class.into(),
            bbox,
            confidence,
        }
    }
}

impl ExclusionZone {
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        bbox.center_x() < self.max_center_x
            && bbox.center_y() < self.max_center_y
            && bbox.width() < self.max_width
            && bbox.height() < self.max_height
    }
}

/// Reduces a detector's boxes to the per-frame summary the control lane needs.
#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    settings: DetectionSettings,
}

impl DetectionAggregator {
    pub fn new(settings: DetectionSettings) -> Self {
        Self { settings }
    }

    /// Distance of a box centre from the walkway centerline. Distances above
    /// the centerline are stretched by `upper_scale` to compensate for
    /// perspective.
    pub fn lateral_distance(&self, bbox: &BoundingBox) -> f64 {
        let center_y = bbox.center_y();
        if center_y < self.settings.centerline_y {
            (self.settings.centerline_y - center_y) * self.settings.upper_scale
        } else {
            center_y - self.settings.centerline_y
        }
    }

    fn is_excluded(&self, detection: &Detection) -> bool {
        self.settings
            .exclusion_zones
            .iter()
            .any(|zone| zone.contains(&detection.bbox))
    }

    pub fn aggregate(&self, detections: &[Detection]) -> DetectionRecord {
        let mut person_count = 0;
        let mut arclight_count = 0;
        let mut min_distance = self.settings.no_person_distance;

        for detection in detections {
            if self.is_excluded(detection) {
                tracing::trace!("Ignoring {} inside exclusion zone", detection.class);
                continue;
            }
            match detection.class.as_str() {
                PERSON_CLASS => {
                    if detection.confidence <= self.settings.person_confidence_threshold {
                        continue;
                    }
                    person_count += 1;
                    min_distance = min_distance.min(self.lateral_distance(&detection.bbox));
                }
                ARCLIGHT_CLASS => arclight_count += 1,
                _ => {}
            }
        }

        DetectionRecord::new(person_count, arclight_count, min_distance)
    }
}
