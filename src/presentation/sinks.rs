use crate::common::DisplayFrame;
use crate::presentation::status::StatusRecord;
use std::io::Write;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Receives display output from the control lane. Implementations must not
/// block; nothing flows back into the state machines.
pub trait PresentationSink: Send {
    fn show_image(&mut self, frame: &DisplayFrame);
    fn show_status(&mut self, status: &StatusRecord);
}

/// Logs each status at debug level.
#[derive(Debug, Default)]
pub struct TracingPresenter;

impl PresentationSink for TracingPresenter {
    fn show_image(&mut self, frame: &DisplayFrame) {
        debug!(
            frame_id = %frame.frame_id(),
            has_image = frame.image().is_some(),
            "Display frame"
        );
    }

    fn show_status(&mut self, status: &StatusRecord) {
        debug!(
            frame_id = %status.frame_id,
            fps = %status.fps_text(),
            locked = status.locked,
            "{} {}",
            status.labels_text(),
            status.status_text()
        );
    }
}

/// Writes one JSON object per status.
pub struct JsonLinesPresenter<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesPresenter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> PresentationSink for JsonLinesPresenter<W> {
    fn show_image(&mut self, _frame: &DisplayFrame) {}

    fn show_status(&mut self, status: &StatusRecord) {
        let result = serde_json::to_writer(&mut self.writer, status)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            warn!("Failed to write status line: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub enum PresentationUpdate {
    Image(DisplayFrame),
    Status(StatusRecord),
}

/// Fans updates out to any number of observers, e.g. a GUI. Slow or missing
/// receivers only lose updates.
#[derive(Debug, Clone)]
pub struct BroadcastPresenter {
    update_tx: broadcast::Sender<PresentationUpdate>,
}

impl BroadcastPresenter {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PresentationUpdate>) {
        let (update_tx, update_rx) = broadcast::channel(capacity);
        (Self { update_tx }, update_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresentationUpdate> {
        self.update_tx.subscribe()
    }
}

impl PresentationSink for BroadcastPresenter {
    fn show_image(&mut self, frame: &DisplayFrame) {
        let _ = self.update_tx.send(PresentationUpdate::Image(frame.clone()));
    }

    fn show_status(&mut self, status: &StatusRecord) {
        let _ = self.update_tx.send(PresentationUpdate::Status(status.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Label;
    use crate::diagnostics::DiagnosticsSnapshot;
    use uuid::Uuid;

    fn status(hazard: bool) -> StatusRecord {
        StatusRecord {
            frame_id: Uuid::new_v4(),
            fps: 25.0,
            fps_smoothed: 25.0,
            person_label: Label::Absent,
            person_count: 0,
            arc_label: Label::Present,
            arclight_count: 1,
            min_lateral_distance: 999.0,
            locked: false,
            hazard,
            diagnostics: DiagnosticsSnapshot::default(),
        }
    }

    #[test]
    fn json_lines_presenter_writes_one_object_per_status() {
        let mut presenter = JsonLinesPresenter::new(Vec::new());
        presenter.show_status(&status(true));
        presenter.show_status(&status(false));
        presenter.show_image(&DisplayFrame::new(Uuid::new_v4(), None));

        let text = String::from_utf8(presenter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["hazard"], true);
        assert_eq!(lines[1]["arc_label"], "present");
    }

    #[test]
    fn broadcast_presenter_without_receivers_does_not_fail() {
        let (mut presenter, update_rx) = BroadcastPresenter::new(4);
        drop(update_rx);
        presenter.show_status(&status(true));
    }

    #[tokio::test]
    async fn broadcast_presenter_delivers_updates_in_order() {
        let (mut presenter, mut update_rx) = BroadcastPresenter::new(4);
        let frame = DisplayFrame::new(Uuid::new_v4(), None);
        presenter.show_image(&frame);
        presenter.show_status(&status(false));

        match update_rx.recv().await.unwrap() {
            PresentationUpdate::Image(image) => assert_eq!(image.frame_id(), frame.frame_id()),
            other => panic!("expected image, got {:?}", other),
        }
        assert!(matches!(
            update_rx.recv().await.unwrap(),
            PresentationUpdate::Status(_)
        ));
    }
}
