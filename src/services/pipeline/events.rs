//! Event Sink
//!
//! Producer side of a trace stream. Events are pushed onto a bounded
//! channel in emission order; the consumer reads until a terminal event.

use symptom_trace_core::TraceStreamEvent;
use tokio::sync::mpsc;

use crate::utils::error::{AppError, AppResult};

/// Sending half of one trace's event stream
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<TraceStreamEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<TraceStreamEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver that drains it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TraceStreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Push one event, waiting for buffer space.
    ///
    /// Fails with `Cancelled` once the receiver is gone.
    pub async fn emit(&self, event: TraceStreamEvent) -> AppResult<()> {
        self.tx.send(event).await.map_err(|_| AppError::Cancelled)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the receiver has been dropped
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
