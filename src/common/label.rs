use serde::Serialize;

/// Debounced, human-facing state of a hazard signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Present,
    #[default]
    Absent,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Present => "present",
            Label::Absent => "absent",
        }
    }

    /// Indicator colour used by the display.
    pub fn color(&self) -> &'static str {
        match self {
            Label::Present => "red",
            Label::Absent => "green",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of feeding one frame to a stabilizer: the held label and this
/// frame's undebounced detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalReading {
    pub label: Label,
    pub raw_present: bool,
}
