pub mod sinks;
pub mod status;

pub use sinks::{
    BroadcastPresenter, JsonLinesPresenter, PresentationSink, PresentationUpdate, TracingPresenter,
};
pub use status::StatusRecord;
