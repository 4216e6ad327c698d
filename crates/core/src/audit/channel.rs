use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{AuditEvent, AuditStore};

struct Pending {
    recorded_at: DateTime<Utc>,
    event: AuditEvent,
}

/// Cloneable sender shared by every service that records events.
///
/// Events are stamped when emitted, not when written.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<Pending>,
}

impl AuditHandle {
    /// Queue an event. Never fails the caller; a closed channel is only logged.
    pub async fn emit(&self, event: AuditEvent) {
        let event_type = event.event_type();
        let pending = Pending {
            recorded_at: Utc::now(),
            event,
        };
        if self.tx.send(pending).await.is_err() {
            error!(event_type, "Audit writer is gone, event dropped");
        }
    }
}

/// Drains the channel into the store until every handle is dropped.
pub struct AuditWriter {
    rx: mpsc::Receiver<Pending>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    /// Returns the number of events persisted. A failed write is logged and skipped.
    pub async fn run(mut self) -> u64 {
        info!("Audit writer started");
        let mut written = 0;

        while let Some(Pending { recorded_at, event }) = self.rx.recv().await {
            match self.store.append(&event, recorded_at) {
                Ok(id) => {
                    written += 1;
                    debug!(id, event_type = event.event_type(), "Audit event stored");
                }
                Err(e) => {
                    error!(event_type = event.event_type(), error = %e, "Failed to store audit event")
                }
            }
        }

        info!(written, "Audit writer stopped");
        written
    }
}

/// Build a connected handle and writer; spawn `writer.run()` on the runtime.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    buffer_size: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    (AuditHandle { tx }, AuditWriter { rx, store })
}
