use std::sync::Arc;

use printfleet::communication::event_system::{
    ErrorUpdate, GcodeViewer, ProgressUpdate, QueueUpdate, StatusUpdate, TempUpdate,
};
use printfleet::{
    Device, EventBus, EventKind, FleetRegistry, Job, JobStatus, LiveState, PrinterStatus, PushEvent,
    Registry,
};

fn fleet() -> Arc<FleetRegistry> {
    let mut prusa = Device::new(1, "Prusa 1");
    prusa.status = PrinterStatus::Printing;
    let mut job = Job::new(11, "benchy");
    job.status = JobStatus::Printing;
    job.printerid = 1;
    prusa.queue.push(job);
    Arc::new(FleetRegistry::with_devices(vec![prusa, Device::new(2, "Ender 3")]))
}

fn frame(event: &str, data: &str) -> PushEvent {
    PushEvent::from_frame(&format!(r#"{{"event":"{event}","data":{data}}}"#)).unwrap()
}

#[test]
fn test_attach_subscribes_every_synchronized_event() {
    let bus = EventBus::new();
    let live = LiveState::attach(&bus, fleet());
    assert_eq!(live.len(), 7);
    assert_eq!(bus.subscriber_count(EventKind::StatusUpdate), 1);
    assert_eq!(bus.subscriber_count(EventKind::JobTime), 0);
}

#[test]
fn test_events_patch_the_registry() {
    let registry = fleet();
    let bus = EventBus::new();
    let _live = LiveState::attach(&bus, registry.clone());

    bus.dispatch(&PushEvent::StatusUpdate(StatusUpdate {
        printer_id: 2,
        status: PrinterStatus::Ready,
    }));
    bus.dispatch(&PushEvent::TempUpdate(TempUpdate {
        printerid: 1,
        extruder_temp: 215.0,
        bed_temp: 60.0,
    }));
    bus.dispatch(&PushEvent::ErrorUpdate(ErrorUpdate {
        printerid: 2,
        error: "Thermal runaway".to_string(),
    }));
    bus.dispatch(&PushEvent::ProgressUpdate(ProgressUpdate { job_id: 11, progress: Some(37.5) }));
    bus.dispatch(&PushEvent::GcodeViewer(GcodeViewer { job_id: 11, gcode: "G1 X10".to_string() }));
    bus.dispatch(&PushEvent::GcodeViewer(GcodeViewer { job_id: 11, gcode: "G1 X20".to_string() }));
    bus.dispatch(&frame("job_status_update", r#"{"job_id":11,"status":"complete"}"#));

    let ender = registry.lookup_device(2).unwrap();
    assert_eq!(ender.status, PrinterStatus::Ready);
    assert_eq!(ender.error.as_deref(), Some("Thermal runaway"));

    let prusa = registry.lookup_device(1).unwrap();
    assert_eq!(prusa.extruder_temp, Some(215.0));
    assert_eq!(prusa.bed_temp, Some(60.0));

    let job = registry.lookup_job(11).unwrap().job;
    assert_eq!(job.progress, Some(37.5));
    assert_eq!(job.gcode, vec!["G1 X10".to_string(), "G1 X20".to_string()]);
    assert_eq!(job.status, JobStatus::Complete);
}

#[test]
fn test_queue_update_replaces_queue() {
    let registry = fleet();
    let bus = EventBus::new();
    let _live = LiveState::attach(&bus, registry.clone());

    bus.dispatch(&frame(
        "queue_update",
        r#"{"printerid":1,"queue":[{"id":11,"name":"benchy","status":"printing"},{"id":12,"name":"vase"}]}"#,
    ));
    let prusa = registry.lookup_device(1).unwrap();
    let ids: Vec<_> = prusa.queue.iter().map(|job| job.id).collect();
    assert_eq!(ids, vec![11, 12]);
    assert_eq!(prusa.job(12).unwrap().status, JobStatus::InQueue);
}

#[test]
fn test_unknown_targets_are_ignored() {
    let registry = fleet();
    let before = registry.snapshot();
    let bus = EventBus::new();
    let _live = LiveState::attach(&bus, registry.clone());

    bus.dispatch(&PushEvent::QueueUpdate(QueueUpdate { printerid: 99, queue: vec![Job::new(5, "ghost")] }));
    bus.dispatch(&PushEvent::ProgressUpdate(ProgressUpdate { job_id: 404, progress: Some(10.0) }));
    bus.dispatch(&PushEvent::ProgressUpdate(ProgressUpdate { job_id: 11, progress: None }));

    assert_eq!(registry.snapshot(), before);
}

#[test]
fn test_teardown_stops_updates() {
    let registry = fleet();
    let bus = EventBus::new();
    let live = LiveState::attach(&bus, registry.clone());
    live.teardown();
    assert_eq!(bus.subscriber_count(EventKind::StatusUpdate), 0);

    let delivered = bus.dispatch(&PushEvent::StatusUpdate(StatusUpdate {
        printer_id: 1,
        status: PrinterStatus::Offline,
    }));
    assert_eq!(delivered, 0);
    assert_eq!(registry.lookup_device(1).unwrap().status, PrinterStatus::Printing);
}
