//! Fire-and-forget analytics event logging.
//!
//! `EventLogger` is the sink port (no-op, in-memory, or SQLite in infra).
//! `EventDispatcher` decouples the request path from the sink: events go
//! through a bounded queue drained by a single background task, so logging
//! can never add latency to a turn or fail it. When the queue is full the
//! newest event is dropped with a warning.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mentora_types::error::EventError;
use mentora_types::event::Event;

/// Sink for analytics events. Callers treat any error as log-only.
pub trait EventLogger: Send + Sync {
    fn log_event(
        &self,
        event: &Event,
    ) -> impl std::future::Future<Output = Result<(), EventError>> + Send;
}

impl<L: EventLogger> EventLogger for Arc<L> {
    async fn log_event(&self, event: &Event) -> Result<(), EventError> {
        self.as_ref().log_event(event).await
    }
}

/// Ignores all events.
#[derive(Default, Clone, Copy)]
pub struct NopEventLogger;

impl EventLogger for NopEventLogger {
    async fn log_event(&self, _event: &Event) -> Result<(), EventError> {
        Ok(())
    }
}

/// Stores events in memory for tests.
#[derive(Default)]
pub struct MemoryEventLogger {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of logged events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("event lock poisoned").clone()
    }
}

impl EventLogger for MemoryEventLogger {
    async fn log_event(&self, event: &Event) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event lock poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Hands events off the request path to a background drain task.
///
/// Cloning shares the queue. The drain task ends once every dispatcher
/// clone has been dropped and the queue is empty; await the handle
/// returned by [`EventDispatcher::spawn`] for a clean shutdown.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<Event>,
}

impl EventDispatcher {
    /// Start a drain task over the given logger with a bounded queue.
    pub fn spawn<L>(logger: L, capacity: usize) -> (Self, JoinHandle<()>)
    where
        L: EventLogger + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Event>(capacity);

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = logger.log_event(&event).await {
                    tracing::warn!(
                        kind = %event.kind,
                        conversation_id = %event.conversation_id,
                        error = %err,
                        "failed to log analytics event"
                    );
                }
            }
        });

        (Self { tx }, handle)
    }

    /// Queue an event. Never blocks; a full queue drops the event with a
    /// warning (drop-newest).
    pub fn dispatch(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(kind = %event.kind, "event queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(kind = %event.kind, "event drain task gone, dropping event");
            }
        }
    }
}
