//! Job queue and history operations.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::json;

use super::{FleetApi, Op};
use crate::communication::{ApiRequest, Part};
use crate::models::{BumpChoice, DeviceId, Envelope, Job, JobFile, JobHistory, JobId, NewJob};

const HISTORY: Op = Op {
    fault: "An error occurred while retrieving the jobs",
    unexpected: "Failed to retrieve jobs. Unexpected response",
};
const ADD: Op = Op {
    fault: "An error occurred while adding the job to the queue",
    unexpected: "Failed to add job to queue. Unexpected response",
};
const RERUN: Op = Op {
    fault: "An error occurred while rerunning the job",
    unexpected: "Failed to rerun job. Unexpected response",
};
const REMOVE: Op = Op {
    fault: "An error occurred while removing the job",
    unexpected: "Failed to remove job. Unexpected response",
};
const BUMP: Op = Op {
    fault: "An error occurred while bumping the job",
    unexpected: "Failed to bump job. Unexpected response",
};
const RELEASE: Op = Op {
    fault: "An error occurred while releasing the job",
    unexpected: "Failed to release job. Unexpected response",
};
const GCODE: Op = Op {
    fault: "An error occurred while retrieving the gcode",
    unexpected: "Failed to retrieve gcode. Unexpected response",
};
const FILE: Op = Op {
    fault: "An error occurred while retrieving the file",
    unexpected: "Failed to retrieve file. Unexpected response",
};
const CLEAR_SPACE: Op = Op {
    fault: "An error occurred while clearing space",
    unexpected: "Failed to clear space. Unexpected response",
};

#[derive(Deserialize)]
#[serde(untagged)]
enum GcodeReply {
    Text(String),
    Wrapped { gcode: String },
}

fn upload_parts(job: &NewJob) -> Vec<Part> {
    let mut parts = vec![
        Part::File {
            name: "file".to_string(),
            file_name: job.file_name.clone(),
            contents: job.contents.clone(),
        },
        Part::Text { name: "name".to_string(), value: job.name.clone() },
    ];
    if let Some(printer_id) = job.printer_id {
        parts.push(Part::Text { name: "printerid".to_string(), value: printer_id.to_string() });
    }
    if let Some(priority) = &job.priority {
        parts.push(Part::Text { name: "priority".to_string(), value: priority.clone() });
    }
    parts
}

impl FleetApi {
    /// One page of job history, newest first unless `oldest_first`.
    pub async fn job_history(
        &self,
        page: u32,
        page_size: u32,
        printer_ids: Option<&[DeviceId]>,
        oldest_first: bool,
    ) -> Option<JobHistory> {
        let mut request = ApiRequest::get("getjobs")
            .query("page", page)
            .query("pageSize", page_size);
        if let Some(ids) = printer_ids {
            let encoded = serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string());
            request = request.query("printerIds", encoded);
        }
        request = request.query("oldestFirst", oldest_first);
        self.fetch(request, HISTORY).await
    }

    /// Queue a file on the printer named in `job.printer_id`.
    pub async fn add_job_to_queue(&self, job: &NewJob) -> Option<Envelope> {
        self.command(ApiRequest::multipart("addjobtoqueue", upload_parts(job)), ADD)
            .await
    }

    /// Queue a file on whichever printer the server picks.
    pub async fn auto_queue(&self, job: &NewJob) -> Option<Envelope> {
        self.command(ApiRequest::multipart("autoqueue", upload_parts(job)), ADD)
            .await
    }

    /// Duplicate a job onto `printer_id`'s queue.
    pub async fn rerun_job(&self, job_id: JobId, printer_id: DeviceId) -> Option<Envelope> {
        let body = json!({ "jobpk": job_id, "printerpk": printer_id });
        self.command(ApiRequest::post("rerunjob", body), RERUN).await
    }

    pub async fn remove_job(&self, job_id: JobId) -> Option<Envelope> {
        let body = json!({ "jobpk": job_id });
        self.command(ApiRequest::post("canceljob", body), REMOVE).await
    }

    pub async fn bump_job(&self, job_id: JobId, printer_id: DeviceId, choice: BumpChoice) -> Option<Envelope> {
        let body = json!({ "printerid": printer_id, "jobid": job_id, "choice": choice.code() });
        self.command(ApiRequest::post("bumpjob", body), BUMP).await
    }

    /// Take a finished job off its printer; `key` selects the outcome the
    /// server records.
    pub async fn release_job(&self, job_id: JobId, key: u32) -> Option<Envelope> {
        let body = json!({ "jobpk": job_id, "key": key });
        self.command(ApiRequest::post("releasejob", body), RELEASE).await
    }

    pub async fn gcode(&self, job: &Job) -> Option<String> {
        let body = match serde_json::to_value(job) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Cannot encode job {}: {}", job.id, e);
                self.notifier().error(GCODE.fault);
                return None;
            }
        };
        let reply: GcodeReply = self.fetch(ApiRequest::post("getgcode", body), GCODE).await?;
        Some(match reply {
            GcodeReply::Text(text) => text,
            GcodeReply::Wrapped { gcode } => gcode,
        })
    }

    /// Fetch a job's file and write it into the downloads directory under
    /// the name the server supplies.
    pub async fn download_file(&self, job_id: JobId) -> Option<PathBuf> {
        let request = ApiRequest::get("getfile").query("jobid", job_id);
        let payload: JobFile = self.fetch(request, FILE).await?;
        match self.files.save_artifact(&payload.file_name, payload.file.as_bytes()).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("Saving file for job {} failed: {}", job_id, e);
                self.notifier().error(FILE.fault);
                None
            }
        }
    }

    pub async fn clear_space(&self) -> Option<Envelope> {
        self.command(ApiRequest::get("clearspace"), CLEAR_SPACE).await
    }
}
