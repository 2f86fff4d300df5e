use crate::common::Label;
use crate::diagnostics::DiagnosticsSnapshot;
use serde::Serialize;
use uuid::Uuid;

/// What the display shows for one processed frame. Purely observational.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRecord {
    pub frame_id: Uuid,
    pub fps: f32,
    pub fps_smoothed: f32,
    pub person_label: Label,
    pub person_count: u32,
    pub arc_label: Label,
    pub arclight_count: u32,
    pub min_lateral_distance: f64,
    pub locked: bool,
    pub hazard: bool,
    pub diagnostics: DiagnosticsSnapshot,
}

impl StatusRecord {
    pub fn status_text(&self) -> String {
        format!(
            "persons: {} arclights: {} min distance: {:.1} hazard: {}",
            self.person_count, self.arclight_count, self.min_lateral_distance, self.hazard
        )
    }

    /// Label lines as the display paints them, e.g. `person: present (red)`.
    pub fn labels_text(&self) -> String {
        format!(
            "person: {} ({}) arc: {} ({})",
            self.person_label,
            self.person_label.color(),
            self.arc_label,
            self.arc_label.color()
        )
    }

    pub fn fps_text(&self) -> String {
        format!("{:.1}", self.fps)
    }
}
