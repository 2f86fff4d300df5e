use crate::diagnostics::Diagnostics;
use crate::error::AppError;
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// One hazard transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditEntry {
    pub at: DateTime<Local>,
    pub hazard: bool,
    pub frame_id: Uuid,
}

impl AuditEntry {
    pub fn new(hazard: bool, frame_id: Uuid) -> Self {
        Self {
            at: Local::now(),
            hazard,
            frame_id,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} - hazard_guard - INFO - existent personnel {}\n",
            self.at.format("%Y-%m-%d %H:%M:%S,%3f"),
            if self.hazard { "True" } else { "False" }
        )
    }
}

#[derive(Debug, Clone)]
pub struct AuditHandle {
    entry_tx: Sender<AuditEntry>,
    diagnostics: Arc<Diagnostics>,
}

impl AuditHandle {
    /// Queue an entry for the writer. A full or closed queue loses the entry
    /// and is counted, it never blocks the caller.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.entry_tx.try_send(entry) {
            let reason = match e {
                TrySendError::Full(_) => "queue full",
                TrySendError::Closed(_) => "writer stopped",
            };
            warn!(frame_id = %entry.frame_id, hazard = entry.hazard, "Audit entry lost: {}", reason);
            self.diagnostics.record_audit_failure();
        }
    }
}

/// Appends audit entries to a sink, one line each.
pub struct AuditLog<W> {
    entry_rx: Receiver<AuditEntry>,
    writer: W,
    diagnostics: Arc<Diagnostics>,
}

impl AuditLog<File> {
    pub async fn open(
        path: impl AsRef<Path>,
        capacity: usize,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<(Self, AuditHandle), AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await
            .map_err(AppError::Audit)?;
        info!("Audit log at {}", path.as_ref().display());
        Ok(Self::new(file, capacity, diagnostics))
    }
}

impl<W> AuditLog<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, capacity: usize, diagnostics: Arc<Diagnostics>) -> (Self, AuditHandle) {
        let (entry_tx, entry_rx) = mpsc::channel(capacity);
        (
            Self {
                entry_rx,
                writer,
                diagnostics: diagnostics.clone(),
            },
            AuditHandle {
                entry_tx,
                diagnostics,
            },
        )
    }

    /// Writes entries until every handle is dropped, then drains and returns
    /// the sink. Cancellation also drains what is already queued.
    pub async fn run(mut self, cancel_token: CancellationToken) -> W {
        loop {
            let entry = tokio::select! {
                biased;
                entry = self.entry_rx.recv() => entry,
                _ = cancel_token.cancelled() => {
                    self.entry_rx.close();
                    self.entry_rx.recv().await
                }
            };
            match entry {
                Some(entry) => self.append(entry).await,
                None => break,
            }
        }
        if let Err(e) = self.writer.flush().await {
            warn!("Failed to flush audit log: {}", e);
        }
        self.writer
    }

    async fn append(&mut self, entry: AuditEntry) {
        info!(target: "audit", frame_id = %entry.frame_id, hazard = entry.hazard, "existent personnel {}", entry.hazard);
        let line = entry.to_line();
        let result = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!(frame_id = %entry.frame_id, "Failed to append audit entry: {}", e);
            self.diagnostics.record_audit_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format_matches_log_layout() {
        let entry = AuditEntry::new(true, Uuid::new_v4());
        let line = entry.to_line();
        assert!(line.ends_with(" - hazard_guard - INFO - existent personnel True\n"));
        assert!(line.starts_with(&entry.at.format("%Y-%m-%d %H:%M:%S").to_string()));
    }

    #[tokio::test]
    async fn entries_are_appended_in_order() {
        let diagnostics = Arc::new(Diagnostics::new());
        let (log, handle) = AuditLog::new(Vec::new(), 8, diagnostics.clone());

        handle.record(AuditEntry::new(true, Uuid::new_v4()));
        handle.record(AuditEntry::new(false, Uuid::new_v4()));
        drop(handle);
        let written = log.run(CancellationToken::new()).await;

        let text = String::from_utf8(written).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("existent personnel True"));
        assert!(lines[1].ends_with("existent personnel False"));
        assert_eq!(diagnostics.snapshot().audit_failures, 0);
    }

    #[tokio::test]
    async fn cancellation_drains_queued_entries() {
        let diagnostics = Arc::new(Diagnostics::new());
        let (log, handle) = AuditLog::new(Vec::new(), 8, diagnostics);
        let cancel_token = CancellationToken::new();

        handle.record(AuditEntry::new(true, Uuid::new_v4()));
        cancel_token.cancel();
        let written = log.run(cancel_token).await;

        assert_eq!(String::from_utf8(written).unwrap().lines().count(), 1);
        drop(handle);
    }

    #[tokio::test]
    async fn full_queue_loses_entry_and_counts_it() {
        let diagnostics = Arc::new(Diagnostics::new());
        let (_log, handle) = AuditLog::new(Vec::new(), 1, diagnostics.clone());

        handle.record(AuditEntry::new(true, Uuid::new_v4()));
        handle.record(AuditEntry::new(false, Uuid::new_v4()));
        assert_eq!(diagnostics.snapshot().audit_failures, 1);
    }

    #[tokio::test]
    async fn open_appends_to_file() {
        let path = std::env::temp_dir().join(format!("hazard_guard_audit_{}.log", Uuid::new_v4()));
        let diagnostics = Arc::new(Diagnostics::new());
        let (log, handle) = AuditLog::open(&path, 4, diagnostics).await.unwrap();

        handle.record(AuditEntry::new(true, Uuid::new_v4()));
        drop(handle);
        log.run(CancellationToken::new()).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("existent personnel True"));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
