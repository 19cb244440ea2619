//! The device registry that live updates are applied to.
//!
//! Synchronizers and the job timer never hold devices themselves; they go
//! through [`Registry`] so the owner of the collection decides how it is
//! stored and observed.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::models::{Device, DeviceId, Job, JobId, JobStatus, PrinterStatus, TimeRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Device {0} not found")]
    DeviceNotFound(DeviceId),
    #[error("Job {0} not found")]
    JobNotFound(JobId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DevicePatch {
    Status(PrinterStatus),
    Queue(Vec<Job>),
    Error(String),
    Temperatures { extruder: f64, bed: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobPatch {
    Progress(f64),
    Status(JobStatus),
    Time(TimeRecord),
    AppendGcode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Device { id: DeviceId, patch: DevicePatch },
    Job { id: JobId, patch: JobPatch },
}

/// A job together with the printer whose queue currently holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLocation {
    pub device_id: DeviceId,
    pub device_status: PrinterStatus,
    pub job: Job,
}

pub trait Registry: Send + Sync {
    fn lookup_device(&self, id: DeviceId) -> Option<Device>;
    fn lookup_job(&self, id: JobId) -> Option<JobLocation>;
    fn apply_update(&self, update: Update) -> Result<(), RegistryError>;
}

/// In-memory registry: an ordered list of devices, scanned linearly.
#[derive(Debug, Default)]
pub struct FleetRegistry {
    devices: RwLock<Vec<Device>>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices: RwLock::new(devices),
        }
    }

    /// Replace the whole fleet, e.g. after `getprinterinfo`.
    pub fn replace_all(&self, devices: Vec<Device>) {
        tracing::info!("Registry loaded with {} devices", devices.len());
        *self.write() = devices;
    }

    pub fn snapshot(&self) -> Vec<Device> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Device>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Device>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_device_patch(device: &mut Device, patch: DevicePatch) {
    match patch {
        DevicePatch::Status(status) => device.status = status,
        DevicePatch::Queue(mut queue) => {
            // Derived state is client-side only; keep it for jobs that stay.
            for job in &mut queue {
                if let Some(previous) = device.job(job.id) {
                    if job.time.is_none() {
                        job.time = previous.time.clone();
                    }
                    if job.gcode.is_empty() {
                        job.gcode = previous.gcode.clone();
                    }
                }
            }
            device.queue = queue;
        }
        DevicePatch::Error(error) => device.error = Some(error),
        DevicePatch::Temperatures { extruder, bed } => {
            device.extruder_temp = Some(extruder);
            device.bed_temp = Some(bed);
        }
    }
}

fn apply_job_patch(job: &mut Job, patch: JobPatch) {
    match patch {
        JobPatch::Progress(progress) => job.progress = Some(progress),
        JobPatch::Status(status) => job.status = status,
        JobPatch::Time(record) => job.time = Some(record),
        JobPatch::AppendGcode(line) => job.gcode.push(line),
    }
}

impl Registry for FleetRegistry {
    fn lookup_device(&self, id: DeviceId) -> Option<Device> {
        self.read().iter().find(|device| device.id == id).cloned()
    }

    fn lookup_job(&self, id: JobId) -> Option<JobLocation> {
        self.read().iter().find_map(|device| {
            device.job(id).map(|job| JobLocation {
                device_id: device.id,
                device_status: device.status.clone(),
                job: job.clone(),
            })
        })
    }

    fn apply_update(&self, update: Update) -> Result<(), RegistryError> {
        let mut devices = self.write();
        match update {
            Update::Device { id, patch } => {
                let device = devices
                    .iter_mut()
                    .find(|device| device.id == id)
                    .ok_or(RegistryError::DeviceNotFound(id))?;
                apply_device_patch(device, patch);
            }
            Update::Job { id, patch } => {
                let job = devices
                    .iter_mut()
                    .find_map(|device| device.job_mut(id))
                    .ok_or(RegistryError::JobNotFound(id))?;
                apply_job_patch(job, patch);
            }
        }
        Ok(())
    }
}
