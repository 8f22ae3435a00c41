//! Async jobs returned by publish and data upload.
//!
//! The service answers 202 with a pointer to a "finished job" resource.
//! That resource is 404 until the job ends, then 200 with the outcome.

use serde::Deserialize;

use crate::error::{DrafterError, Result};

/// Handle to a job scheduled by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AsyncJob {
    /// Path (or URL) polled for the outcome, e.g. `/v1/status/finished-jobs/<id>`
    pub finished_job: String,
    #[serde(default)]
    pub restart_id: Option<String>,
}

impl AsyncJob {
    pub(crate) fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| DrafterError::Parse(format!("invalid async job response: {} (body: {})", e, body)))
    }

    /// Job id: the last segment of the finished-job path.
    pub fn id(&self) -> &str {
        self.finished_job
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// Outcome of polling a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending,
    Completed(serde_json::Value),
    /// Job ended with `"type": "error"`; carries the server message
    Failed(String),
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub(crate) fn from_finished_body(body: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| DrafterError::Parse(format!("invalid job status response: {}", e)))?;

        match json["type"].as_str() {
            Some("error") => {
                let message = json["message"]
                    .as_str()
                    .or_else(|| json["details"]["message"].as_str())
                    .unwrap_or("job failed")
                    .to_string();
                Ok(JobStatus::Failed(message))
            }
            _ => Ok(JobStatus::Completed(json)),
        }
    }
}
