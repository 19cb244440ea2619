//! Typed push-channel events and the subscribe-by-name bus they are
//! dispatched through.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DeviceId, Job, JobId, JobStatus, PrinterStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub job_id: JobId,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusUpdate {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTime {
    pub job_id: JobId,
    /// Estimated print duration in seconds.
    pub total_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub printer_id: DeviceId,
    pub status: PrinterStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueUpdate {
    pub printerid: DeviceId,
    pub queue: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorUpdate {
    pub printerid: DeviceId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempUpdate {
    pub printerid: DeviceId,
    pub extruder_temp: f64,
    pub bed_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeViewer {
    pub job_id: JobId,
    pub gcode: String,
}

/// Every event the service pushes. On the wire each frame is
/// `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    ProgressUpdate(ProgressUpdate),
    JobStatusUpdate(JobStatusUpdate),
    JobTime(JobTime),
    StatusUpdate(StatusUpdate),
    QueueUpdate(QueueUpdate),
    ErrorUpdate(ErrorUpdate),
    TempUpdate(TempUpdate),
    GcodeViewer(GcodeViewer),
}

impl PushEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PushEvent::ProgressUpdate(_) => EventKind::ProgressUpdate,
            PushEvent::JobStatusUpdate(_) => EventKind::JobStatusUpdate,
            PushEvent::JobTime(_) => EventKind::JobTime,
            PushEvent::StatusUpdate(_) => EventKind::StatusUpdate,
            PushEvent::QueueUpdate(_) => EventKind::QueueUpdate,
            PushEvent::ErrorUpdate(_) => EventKind::ErrorUpdate,
            PushEvent::TempUpdate(_) => EventKind::TempUpdate,
            PushEvent::GcodeViewer(_) => EventKind::GcodeViewer,
        }
    }

    /// Decode a text frame.
    pub fn from_frame(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProgressUpdate,
    JobStatusUpdate,
    JobTime,
    StatusUpdate,
    QueueUpdate,
    ErrorUpdate,
    TempUpdate,
    GcodeViewer,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::ProgressUpdate => "progress_update",
            EventKind::JobStatusUpdate => "job_status_update",
            EventKind::JobTime => "job_time",
            EventKind::StatusUpdate => "status_update",
            EventKind::QueueUpdate => "queue_update",
            EventKind::ErrorUpdate => "error_update",
            EventKind::TempUpdate => "temp_update",
            EventKind::GcodeViewer => "gcode_viewer",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type Handler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

type HandlerTable = HashMap<EventKind, Vec<(Uuid, Handler)>>;

/// Fans push events out to the handlers registered for their kind.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<HandlerTable>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `handler` for every future event of `kind`. The returned
    /// handle must be unsubscribed explicitly; dropping it leaves the
    /// handler installed.
    pub fn subscribe<F>(self: &Arc<Self>, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.table()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!("Subscribed {} to {}", id, kind);
        Subscription {
            id,
            kind,
            bus: Arc::downgrade(self),
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.table().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver one event. Returns how many handlers saw it.
    pub fn dispatch(&self, event: &PushEvent) -> usize {
        let kind = event.kind();
        // Handlers run without the table lock so they may (un)subscribe.
        let handlers: Vec<Handler> = self
            .table()
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        if handlers.is_empty() {
            tracing::trace!("No handlers for {}", kind);
        }
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    fn remove(&self, kind: EventKind, id: Uuid) -> bool {
        let mut table = self.table();
        let Some(list) = table.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(entry, _)| *entry != id);
        before != list.len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HandlerTable> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one registered handler.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    kind: EventKind,
    bus: Weak<EventBus>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler. Returns false if the bus is gone or the handler
    /// was already removed.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => {
                tracing::debug!("Unsubscribed {} from {}", self.id, self.kind);
                bus.remove(self.kind, self.id)
            }
            None => false,
        }
    }
}
