// printfleet: client-side data access for a 3D-printer fleet service

pub mod api;
pub mod communication;
pub mod config;
pub mod file_manager;
pub mod job_timer;
pub mod live_state;
pub mod models;
pub mod notify;
pub mod registry;

pub use api::FleetApi;
pub use communication::event_system::{EventBus, EventKind, PushEvent, Subscription};
pub use communication::{ApiRequest, Transport, TransportError};
pub use job_timer::JobTimer;
pub use live_state::LiveState;
pub use models::{Device, Job, JobStatus, PrinterStatus, TimeRecord};
pub use notify::{Level, Notification, Notifier};
pub use registry::{FleetRegistry, Registry};
