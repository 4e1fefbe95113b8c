//! Engine events and the channel that carries them to the UI side

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use tokio::sync::mpsc;

use crate::install::catalog::{BatchResult, Status};

/// Something the orchestration worker wants the UI to know about.
///
/// Items are identified by their index in the batch (selection order).
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// An item moved to a new lifecycle status
    StatusChanged {
        index: usize,
        name: String,
        status: Status,
    },

    /// Bytes arrived for an item that is downloading.
    ///
    /// `percent` is `None` when the server did not declare a content length.
    DownloadProgress {
        index: usize,
        bytes_read: u64,
        total_bytes: Option<u64>,
        percent: Option<u8>,
    },

    /// One more item of the batch reached a terminal state
    BatchProgress { completed: usize, total: usize },

    /// Emitted exactly once, after every item is settled and the hook (if any) has run
    BatchFinished(BatchResult),
}

/// Sending half of the event channel.
///
/// Lifecycle events go through [`EventSink::send`], which waits for room so the
/// renderer sees every transition. Download ticks go through
/// [`EventSink::send_best_effort`] and are dropped when the channel is full.
/// Neither ever fails the run: once the receiver is gone the sink logs once and
/// discards everything afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<EngineEvent>>,
    disabled: Arc<AtomicBool>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self {
            tx: Some(tx),
            disabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A sink with no receiver; every event is discarded
    pub fn detached() -> Self {
        Self::default()
    }

    fn sender(&self) -> Option<&mpsc::Sender<EngineEvent>> {
        if self.disabled.load(Ordering::Relaxed) {
            return None;
        }
        self.tx.as_ref()
    }

    fn disable(&self) {
        if !self.disabled.swap(true, Ordering::Relaxed) {
            warn!("Event channel closed, continuing without UI updates");
        }
    }

    /// Deliver a lifecycle event, waiting for channel capacity
    pub async fn send(&self, event: EngineEvent) {
        let Some(tx) = self.sender() else {
            return;
        };
        if tx.send(event).await.is_err() {
            self.disable();
        }
    }

    /// Deliver a progress tick if there is room right now
    pub fn send_best_effort(&self, event: EngineEvent) {
        let Some(tx) = self.sender() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // A slow renderer just misses some ticks
            }
            Err(mpsc::error::TrySendError::Closed(_)) => self.disable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_channel_disables_sink() {
        let (tx, rx) = mpsc::channel(4);
        let sink = EventSink::new(tx);
        drop(rx);

        sink.send(EngineEvent::BatchProgress {
            completed: 1,
            total: 2,
        })
        .await;
        assert!(sink.disabled.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = EventSink::new(tx);

        sink.send(EngineEvent::BatchProgress {
            completed: 1,
            total: 2,
        })
        .await;
        sink.send(EngineEvent::BatchProgress {
            completed: 2,
            total: 2,
        })
        .await;

        let mut seen = Vec::new();
        while let Ok(EngineEvent::BatchProgress { completed, .. }) = rx.try_recv() {
            seen.push(completed);
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn detached_sink_accepts_events() {
        let sink = EventSink::detached();
        sink.send(EngineEvent::BatchProgress {
            completed: 0,
            total: 0,
        })
        .await;
        sink.send_best_effort(EngineEvent::BatchProgress {
            completed: 0,
            total: 0,
        });
    }

    fn tick(bytes_read: u64) -> EngineEvent {
        EngineEvent::DownloadProgress {
            index: 0,
            bytes_read,
            total_bytes: None,
            percent: None,
        }
    }

    #[tokio::test]
    async fn full_channel_drops_ticks_but_waits_for_lifecycle_events() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = EventSink::new(tx);

        sink.send_best_effort(tick(1));
        sink.send_best_effort(tick(2));

        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = rx.recv().await {
                seen.push(event);
            }
            seen
        });
        sink.send(EngineEvent::BatchProgress {
            completed: 1,
            total: 1,
        })
        .await;
        drop(sink);

        let seen = reader.await.unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], EngineEvent::DownloadProgress { bytes_read: 1, .. }));
        assert!(matches!(seen[1], EngineEvent::BatchProgress { completed: 1, .. }));
    }
}
