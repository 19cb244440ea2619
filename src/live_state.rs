//! Live-state synchronizers: push events applied to the registry.

use std::sync::Arc;

use crate::communication::event_system::{EventBus, EventKind, PushEvent, Subscription};
use crate::registry::{DevicePatch, JobPatch, Registry, Update};

/// Events that patch the registry directly. `job_time` belongs to the job
/// timer.
pub const SYNCHRONIZED_EVENTS: [EventKind; 7] = [
    EventKind::StatusUpdate,
    EventKind::QueueUpdate,
    EventKind::ErrorUpdate,
    EventKind::TempUpdate,
    EventKind::ProgressUpdate,
    EventKind::JobStatusUpdate,
    EventKind::GcodeViewer,
];

/// Map an event to the registry update it implies.
pub fn update_for(event: &PushEvent) -> Option<Update> {
    let update = match event {
        PushEvent::StatusUpdate(e) => Update::Device {
            id: e.printer_id,
            patch: DevicePatch::Status(e.status.clone()),
        },
        PushEvent::QueueUpdate(e) => Update::Device {
            id: e.printerid,
            patch: DevicePatch::Queue(e.queue.clone()),
        },
        PushEvent::ErrorUpdate(e) => Update::Device {
            id: e.printerid,
            patch: DevicePatch::Error(e.error.clone()),
        },
        PushEvent::TempUpdate(e) => Update::Device {
            id: e.printerid,
            patch: DevicePatch::Temperatures { extruder: e.extruder_temp, bed: e.bed_temp },
        },
        PushEvent::ProgressUpdate(e) => Update::Job {
            id: e.job_id,
            patch: JobPatch::Progress(e.progress?),
        },
        PushEvent::JobStatusUpdate(e) => Update::Job {
            id: e.job_id,
            patch: JobPatch::Status(e.status.clone()),
        },
        PushEvent::GcodeViewer(e) => Update::Job {
            id: e.job_id,
            patch: JobPatch::AppendGcode(e.gcode.clone()),
        },
        PushEvent::JobTime(_) => return None,
    };
    Some(update)
}

/// Apply one event. A missing device or job is logged and ignored.
/// Returns whether the registry changed.
pub fn apply_event(registry: &dyn Registry, event: &PushEvent) -> bool {
    let Some(update) = update_for(event) else {
        return false;
    };
    match registry.apply_update(update) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", event.kind(), e);
            false
        }
    }
}

/// Install the synchronizer for a single event kind.
pub fn synchronize(bus: &Arc<EventBus>, registry: Arc<dyn Registry>, kind: EventKind) -> Subscription {
    bus.subscribe(kind, move |event| {
        apply_event(registry.as_ref(), event);
    })
}

/// The full set of synchronizers for one registry. Torn down explicitly by
/// its owner.
pub struct LiveState {
    subscriptions: Vec<Subscription>,
}

impl LiveState {
    pub fn attach(bus: &Arc<EventBus>, registry: Arc<dyn Registry>) -> Self {
        let subscriptions = SYNCHRONIZED_EVENTS
            .iter()
            .map(|&kind| synchronize(bus, registry.clone(), kind))
            .collect();
        tracing::info!("Live-state synchronizers attached");
        Self { subscriptions }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn teardown(self) {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        tracing::info!("Live-state synchronizers detached");
    }
}
