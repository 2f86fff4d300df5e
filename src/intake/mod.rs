pub mod acquisition;
pub mod aggregator;
pub mod record;
pub mod replay;
pub mod source;

pub use acquisition::AcquisitionLane;
pub use aggregator::{BoundingBox, Detection, DetectionAggregator};
pub use record::DetectionRecord;
pub use replay::ReplaySource;
pub use source::{
    Capture, DetectionSource, Detector, DetectorOutput, FrameSource, InferenceSource, SourceEvent,
    SourceFrame,
};
