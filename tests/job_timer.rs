use std::sync::Arc;
use std::time::Duration;

use printfleet::communication::event_system::{JobStatusUpdate, JobTime};
use printfleet::config::TrackerConfig;
use printfleet::job_timer::MAX_ESTIMATE_SECS;
use printfleet::notify::MemoryNotifier;
use printfleet::registry::{DevicePatch, Update};
use printfleet::{
    Device, EventBus, FleetRegistry, Job, JobStatus, JobTimer, Level, PrinterStatus, PushEvent,
    Registry, TimeRecord,
};
use tokio::time::sleep;

fn fleet(status: PrinterStatus) -> Arc<FleetRegistry> {
    let mut prusa = Device::new(1, "Prusa 1");
    prusa.status = status;
    prusa.queue.push(Job::new(11, "benchy"));
    Arc::new(FleetRegistry::with_devices(vec![prusa]))
}

fn timer_for(registry: &Arc<FleetRegistry>, config: TrackerConfig) -> (JobTimer, MemoryNotifier) {
    let notifier = MemoryNotifier::new();
    let timer = JobTimer::new(registry.clone(), Arc::new(notifier.clone()), config);
    (timer, notifier)
}

fn time_of(registry: &FleetRegistry, job_id: u64) -> TimeRecord {
    registry.lookup_job(job_id).unwrap().job.time.unwrap()
}

fn set_status(registry: &FleetRegistry, status: PrinterStatus) {
    registry
        .apply_update(Update::Device { id: 1, patch: DevicePatch::Status(status) })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_printing_job_counts_down() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    assert!(timer.start(11, 100));
    assert_eq!(time_of(&registry, 11).remaining, 100);

    sleep(Duration::from_millis(5500)).await;
    let record = time_of(&registry, 11);
    assert_eq!(record.elapsed, 5);
    assert_eq!(record.remaining, 95);
    assert_eq!(record.extra, 0);
    assert!(timer.is_running(11));
    timer.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_unknown_job_does_not_start() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    assert!(!timer.start(404, 60));
    assert_eq!(timer.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_overrun_accrues_extra_until_printer_stops() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    timer.start(11, 2);
    let eta_at_start = time_of(&registry, 11).eta;

    sleep(Duration::from_millis(4500)).await;
    let record = time_of(&registry, 11);
    assert_eq!(record.remaining, 0);
    assert_eq!(record.extra, 2);
    assert_eq!(record.eta - eta_at_start, chrono::Duration::seconds(2));
    assert!(timer.is_running(11));

    set_status(&registry, PrinterStatus::Ready);
    sleep(Duration::from_millis(1000)).await;
    assert!(!timer.is_running(11));
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_stops_timer() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    timer.start(11, 100);
    sleep(Duration::from_millis(2500)).await;

    set_status(&registry, PrinterStatus::Complete);
    sleep(Duration::from_millis(1000)).await;
    assert!(!timer.is_running(11));

    let frozen = time_of(&registry, 11);
    assert_eq!(frozen.elapsed, 2);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(time_of(&registry, 11), frozen);
}

#[tokio::test(start_paused = true)]
async fn test_restart_supersedes_previous_timer() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    timer.start(11, 100);
    sleep(Duration::from_millis(3500)).await;

    assert!(timer.start(11, 50));
    assert_eq!(timer.active_count(), 1);
    assert_eq!(time_of(&registry, 11).remaining, 50);

    sleep(Duration::from_millis(2500)).await;
    let record = time_of(&registry, 11);
    assert_eq!(record.total, 50);
    assert_eq!(record.elapsed, 2);
    assert_eq!(record.remaining, 48);
    timer.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_long_pause_raises_each_alert_once() {
    let registry = fleet(PrinterStatus::Paused);
    let config = TrackerConfig {
        pause_warnings: vec![3, 5],
        pause_error: 7,
        ..TrackerConfig::default()
    };
    let (timer, notifier) = timer_for(&registry, config);
    timer.start(11, 100);

    sleep(Duration::from_millis(10_500)).await;
    let record = time_of(&registry, 11);
    assert_eq!(record.pause, 10);
    assert_eq!(record.total, 110);
    assert_eq!(record.remaining, 100);

    let notes = notifier.snapshot();
    assert_eq!(notes.len(), 3);
    assert_eq!(notifier.count(Level::Warning), 2);
    assert_eq!(notifier.count(Level::Error), 1);
    assert!(notes[2].message.contains("'benchy'"));
    assert!(notes[2].message.ends_with("It should be cancelled."));

    set_status(&registry, PrinterStatus::Printing);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(time_of(&registry, 11).pause, 0);
    timer.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_bus_events_drive_timer() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    let bus = EventBus::new();
    let subscriptions = timer.attach(&bus);

    bus.dispatch(&PushEvent::JobTime(JobTime { job_id: 11, total_time: 59.6 }));
    assert!(timer.is_running(11));
    assert_eq!(time_of(&registry, 11).total, 60);

    sleep(Duration::from_millis(1500)).await;
    bus.dispatch(&PushEvent::JobStatusUpdate(JobStatusUpdate {
        job_id: 11,
        status: JobStatus::Printing,
    }));
    assert!(timer.is_running(11));

    bus.dispatch(&PushEvent::JobStatusUpdate(JobStatusUpdate {
        job_id: 11,
        status: JobStatus::Cancelled,
    }));
    assert!(!timer.is_running(11));
    assert_eq!(time_of(&registry, 11).elapsed, 1);

    for subscription in subscriptions {
        assert!(subscription.unsubscribe());
    }
}

#[tokio::test(start_paused = true)]
async fn test_oversized_estimate_is_capped() {
    let registry = fleet(PrinterStatus::Printing);
    let (timer, _notifier) = timer_for(&registry, TrackerConfig::default());
    let bus = EventBus::new();
    let _subscriptions = timer.attach(&bus);

    let event = PushEvent::from_frame(r#"{"event":"job_time","data":{"job_id":11,"total_time":1e13}}"#)
        .unwrap();
    assert_eq!(bus.dispatch(&event), 1);
    assert!(timer.is_running(11));
    assert_eq!(time_of(&registry, 11).total, MAX_ESTIMATE_SECS);

    sleep(Duration::from_millis(1500)).await;
    let record = time_of(&registry, 11);
    assert_eq!(record.elapsed, 1);
    assert_eq!(record.remaining, MAX_ESTIMATE_SECS - 1);
    timer.shutdown();
}
