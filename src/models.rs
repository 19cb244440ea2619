//! Contains the data models shared by the accessors, the registry and the
//! push-channel handlers.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DeviceId = u64;
pub type JobId = u64;

/// Connectivity/activity state reported for a printer.
///
/// Unknown strings from the server are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrinterStatus {
    #[default]
    Configuring,
    Ready,
    Printing,
    Paused,
    Complete,
    Cancelled,
    Error,
    Offline,
    Other(String),
}

impl PrinterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PrinterStatus::Configuring => "configuring",
            PrinterStatus::Ready => "ready",
            PrinterStatus::Printing => "printing",
            PrinterStatus::Paused => "paused",
            PrinterStatus::Complete => "complete",
            PrinterStatus::Cancelled => "cancelled",
            PrinterStatus::Error => "error",
            PrinterStatus::Offline => "offline",
            PrinterStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PrinterStatus::Complete | PrinterStatus::Cancelled | PrinterStatus::Error
        )
    }
}

impl From<String> for PrinterStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "configuring" => PrinterStatus::Configuring,
            "ready" => PrinterStatus::Ready,
            "printing" => PrinterStatus::Printing,
            "paused" => PrinterStatus::Paused,
            "complete" => PrinterStatus::Complete,
            "cancelled" => PrinterStatus::Cancelled,
            "error" => PrinterStatus::Error,
            "offline" => PrinterStatus::Offline,
            _ => PrinterStatus::Other(s),
        }
    }
}

impl From<&str> for PrinterStatus {
    fn from(s: &str) -> Self {
        PrinterStatus::from(s.to_string())
    }
}

impl From<PrinterStatus> for String {
    fn from(status: PrinterStatus) -> Self {
        match status {
            PrinterStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for PrinterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a print job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    #[default]
    InQueue,
    Printing,
    Paused,
    Complete,
    Cancelled,
    Error,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::InQueue => "inqueue",
            JobStatus::Printing => "printing",
            JobStatus::Paused => "paused",
            JobStatus::Complete => "complete",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Error => "error",
            JobStatus::Other(s) => s,
        }
    }

    /// Complete, cancelled and errored jobs never tick again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete | JobStatus::Cancelled | JobStatus::Error
        )
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "inqueue" => JobStatus::InQueue,
            "printing" => JobStatus::Printing,
            "paused" => JobStatus::Paused,
            "complete" => JobStatus::Complete,
            "cancelled" => JobStatus::Cancelled,
            "error" => JobStatus::Error,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        JobStatus::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side estimate of a job's timing, in whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRecord {
    pub total: u64,
    pub elapsed: u64,
    pub remaining: u64,
    pub extra: u64,
    pub pause: u64,
    pub eta: DateTime<Utc>,
}

impl TimeRecord {
    pub fn new(total: u64, now: DateTime<Utc>) -> Self {
        Self {
            total,
            elapsed: 0,
            remaining: total,
            extra: 0,
            pause: 0,
            eta: eta_after(now, total),
        }
    }

    /// Move the eta `secs` later.
    pub fn push_eta(&mut self, secs: u64) {
        self.eta = eta_after(self.eta, secs);
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// `from + secs`, saturating at the latest instant chrono can represent.
pub fn eta_after(from: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A queued or active print task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_name_original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub printer: String,
    #[serde(default)]
    pub printerid: DeviceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Server-side estimate in seconds, when the queue snapshot carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gcode: Vec<String>,
    #[serde(skip)]
    pub time: Option<TimeRecord>,
}

impl Job {
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A registered printer together with its live queue.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hwid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: PrinterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extruder_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_temp: Option<f64>,
    #[serde(default)]
    pub queue: Vec<Job>,
}

impl Device {
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.queue.iter().find(|job| job.id == job_id)
    }

    pub fn job_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.queue.iter_mut().find(|job| job.id == job_id)
    }
}

/// A serial port the server detected; registering it turns it into a `Device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialPort {
    pub device: String,
    pub description: String,
    pub hwid: String,
}

/// Payload of the `register` operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterRegistration {
    pub device: String,
    pub description: String,
    pub hwid: String,
    pub name: String,
}

impl PrinterRegistration {
    pub fn from_port(port: SerialPort, name: impl Into<String>) -> Self {
        Self {
            device: port.device,
            description: port.description,
            hwid: port.hwid,
            name: name.into(),
        }
    }
}

/// One row of the job history listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub printer: String,
    #[serde(default)]
    pub file_name_original: String,
}

/// A page of job history as returned by `getjobs`: `[jobs, total]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHistory(pub Vec<JobSummary>, pub u64);

impl JobHistory {
    pub fn jobs(&self) -> &[JobSummary] {
        &self.0
    }

    pub fn total(&self) -> u64 {
        self.1
    }
}

/// Reply envelope of mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Raw file payload returned by `getfile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobFile {
    pub file: String,
    pub file_name: String,
}

/// A gcode file to be queued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub name: String,
    pub file_name: String,
    pub contents: Vec<u8>,
    /// Target printer; `None` lets the server pick one (`autoqueue`).
    pub printer_id: Option<DeviceId>,
    pub priority: Option<String>,
}

/// Direction for `bumpjob`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpChoice {
    Up,
    Down,
    Front,
    Back,
}

impl BumpChoice {
    pub fn code(self) -> u8 {
        match self {
            BumpChoice::Up => 1,
            BumpChoice::Down => 2,
            BumpChoice::Front => 3,
            BumpChoice::Back => 4,
        }
    }
}
