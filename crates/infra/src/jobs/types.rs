//! Core job types and the status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use roster_core::JobId;

/// Job kind for routing to the appropriate handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Bulk CSV import of person records
    Import,
    /// Bulk CSV export of person records
    Export,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Import => "import",
            JobKind::Export => "export",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job execution status.
///
/// `Pending -> Running -> Succeeded | Failed`; there are no back-transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be picked up
    Pending,
    /// Claimed by a worker and executing
    Running,
    /// Finished with a result payload
    Succeeded,
    /// Finished with an error message
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Succeeded)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition: {} -> {}", .from.as_str(), .to.as_str())]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Outcome of an import: rows created plus one message per rejected row, in
/// input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: usize,
    pub errors: Vec<String>,
}

/// Reference to a generated export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub rows: usize,
}

/// Kind-specific result payload of a succeeded job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutput {
    Import(ImportReport),
    Export(ExportArtifact),
}

/// A background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Job kind for routing
    pub kind: JobKind,
    /// JSON payload; released once the job is terminal
    pub payload: serde_json::Value,
    /// Current status
    pub status: JobStatus,
    /// Result payload (set on success)
    pub output: Option<JobOutput>,
    /// Error message (set on failure)
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(kind: JobKind, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            kind,
            payload,
            status: JobStatus::Pending,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// Import job carrying the uploaded CSV text.
    pub fn import(csv_text: impl Into<String>) -> Self {
        Self::new(JobKind::Import, serde_json::json!({ "csv": csv_text.into() }))
    }

    pub fn export() -> Self {
        Self::new(JobKind::Export, serde_json::Value::Null)
    }

    fn transition(&mut self, to: JobStatus) -> Result<DateTime<Utc>, InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition { from: self.status, to });
        }
        let now = Utc::now();
        self.status = to;
        self.updated_at = now;
        Ok(now)
    }

    /// Mark job as running.
    pub fn mark_running(&mut self) -> Result<(), InvalidTransition> {
        let now = self.transition(JobStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Mark job as succeeded with its result.
    pub fn mark_succeeded(&mut self, output: JobOutput) -> Result<(), InvalidTransition> {
        let now = self.transition(JobStatus::Succeeded)?;
        self.output = Some(output);
        self.finish(now);
        Ok(())
    }

    /// Mark job as failed, capturing the error.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        let now = self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.finish(now);
        Ok(())
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.finished_at = Some(now);
        self.payload = serde_json::Value::Null;
    }

    /// Wall time between claim and completion, once terminal.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }

    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            id: self.id,
            kind: self.kind,
            status: self.status,
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

/// Externally observable snapshot of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub output: Option<JobOutput>,
    pub error: Option<String>,
}

/// Result of handler execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully
    Success(JobOutput),
    /// Job failed with an error
    Failure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_lifecycle() {
        let mut job = Job::import("name\n");

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());

        job.mark_running().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());

        job.mark_succeeded(JobOutput::Import(ImportReport::default()))
            .unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.duration_ms().is_some());
        assert!(job.payload.is_null());
    }

    #[test]
    fn no_back_transitions() {
        let mut job = Job::export();
        assert_eq!(
            job.mark_succeeded(JobOutput::Import(ImportReport::default())),
            Err(InvalidTransition {
                from: JobStatus::Pending,
                to: JobStatus::Succeeded
            })
        );

        job.mark_running().unwrap();
        assert!(job.mark_running().is_err());
        job.mark_failed("boom").unwrap();
        assert_eq!(job.error.as_deref(), Some("boom"));

        assert!(job.mark_running().is_err());
        assert!(job.mark_failed("again").is_err());
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn status_strings() {
        assert_eq!(JobStatus::Succeeded.as_str(), "succeeded");
        assert_eq!(
            serde_json::to_value(JobStatus::Running).unwrap(),
            serde_json::json!("running")
        );
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn output_is_tagged() {
        let out = JobOutput::Import(ImportReport {
            created: 3,
            errors: vec!["Row 2: bad".to_string()],
        });
        assert_eq!(
            serde_json::to_value(out).unwrap(),
            serde_json::json!({ "type": "import", "created": 3, "errors": ["Row 2: bad"] })
        );
    }
}
