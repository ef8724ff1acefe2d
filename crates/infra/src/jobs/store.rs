//! Job storage implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use roster_core::JobId;

use super::types::{InvalidTransition, Job, JobStatus, JobStatusView};

/// Job store abstraction.
///
/// Shared by the submission path (enqueue, status polling) and the workers
/// (claim, update). Status changes are monotonic: the store refuses any update
/// that is not a legal transition from the stored status.
pub trait JobStore: Send + Sync {
    /// Enqueue a new job.
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Persist a status transition.
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the oldest pending job, atomically marking it running.
    /// Returns None if no jobs are available.
    fn claim_next(&self) -> Result<Option<Job>, JobStoreError>;

    /// Jobs currently in `status`, oldest first.
    fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, JobStoreError>;

    /// Get job statistics.
    fn stats(&self) -> Result<JobStats, JobStoreError>;

    /// Externally observable status; read-only.
    fn get_status(&self, job_id: JobId) -> Result<Option<JobStatusView>, JobStoreError> {
        Ok(self.get(job_id)?.map(|job| job.status_view()))
    }
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("job {0}: {1}")]
    InvalidTransition(JobId, InvalidTransition),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Job statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<JobId, Job>>, JobStoreError> {
        self.jobs
            .read()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<JobId, Job>>, JobStoreError> {
        self.jobs
            .write()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".to_string()))
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.write()?;
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        Ok(self.read()?.get(&job_id).cloned())
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.write()?;
        let stored = jobs.get_mut(&job.id).ok_or(JobStoreError::NotFound(job.id))?;
        if !stored.status.can_transition_to(job.status) {
            return Err(JobStoreError::InvalidTransition(
                job.id,
                InvalidTransition {
                    from: stored.status,
                    to: job.status,
                },
            ));
        }
        *stored = job.clone();
        Ok(())
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        let mut jobs = self.write()?;

        // Oldest pending job first (FIFO); ties broken by id.
        let next = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id);

        let Some(job_id) = next else {
            return Ok(None);
        };
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(None);
        };
        job.mark_running()
            .map_err(|e| JobStoreError::InvalidTransition(job_id, e))?;
        Ok(Some(job.clone()))
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.read()?;
        let mut matching: Vec<Job> = jobs.values().filter(|j| j.status == status).cloned().collect();
        matching.sort_by_key(|j| (j.created_at, j.id));
        Ok(matching)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        let jobs = self.read()?;
        let mut stats = JobStats::default();

        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Succeeded => stats.succeeded += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }

        Ok(stats)
    }
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next()
    }

    fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, JobStoreError> {
        (**self).list_by_status(status)
    }

    fn stats(&self) -> Result<JobStats, JobStoreError> {
        (**self).stats()
    }

    fn get_status(&self, job_id: JobId) -> Result<Option<JobStatusView>, JobStoreError> {
        (**self).get_status(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{ImportReport, JobOutput};

    #[test]
    fn enqueue_and_claim() {
        let store = InMemoryJobStore::new();

        let job = Job::export();
        let job_id = store.enqueue(job).unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, job_id);
        assert_eq!(claimed.status, JobStatus::Running);

        // Running jobs are never handed out again.
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn claims_are_fifo() {
        let store = InMemoryJobStore::new();
        let first = store.enqueue(Job::export()).unwrap();
        let second = store.enqueue(Job::import("name\n")).unwrap();

        assert_eq!(store.claim_next().unwrap().unwrap().id, first);
        assert_eq!(store.claim_next().unwrap().unwrap().id, second);
    }

    #[test]
    fn update_rejects_back_transitions() {
        let store = InMemoryJobStore::new();
        let job_id = store.enqueue(Job::export()).unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        claimed
            .mark_succeeded(JobOutput::Import(ImportReport::default()))
            .unwrap();
        store.update(&claimed).unwrap();

        // Stale copy claiming it is still running.
        let mut stale = store.get(job_id).unwrap().unwrap();
        stale.status = JobStatus::Running;
        assert!(matches!(
            store.update(&stale),
            Err(JobStoreError::InvalidTransition(id, _)) if id == job_id
        ));
        assert_eq!(
            store.get(job_id).unwrap().unwrap().status,
            JobStatus::Succeeded
        );
    }

    #[test]
    fn update_unknown_job_is_not_found() {
        let store = InMemoryJobStore::new();
        let job = Job::export();
        assert_eq!(store.update(&job), Err(JobStoreError::NotFound(job.id)));
    }

    #[test]
    fn get_status_is_idempotent() {
        let store = InMemoryJobStore::new();
        let job_id = store.enqueue(Job::import("name\n")).unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        claimed
            .mark_succeeded(JobOutput::Import(ImportReport {
                created: 1,
                errors: vec![],
            }))
            .unwrap();
        store.update(&claimed).unwrap();

        let first = store.get_status(job_id).unwrap().unwrap();
        for _ in 0..5 {
            assert_eq!(store.get_status(job_id).unwrap().unwrap(), first);
        }
        assert!(store.get_status(JobId::new()).unwrap().is_none());
    }

    #[test]
    fn stats_tracking() {
        let store = InMemoryJobStore::new();

        for _ in 0..5 {
            store.enqueue(Job::export()).unwrap();
        }

        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 5);

        store.claim_next().unwrap();
        let mut job = store.claim_next().unwrap().unwrap();
        job.mark_failed("boom").unwrap();
        store.update(&job).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(store.list_by_status(JobStatus::Running).unwrap().len(), 1);
        assert_eq!(store.list_by_status(JobStatus::Failed).unwrap()[0].id, job.id);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.failed, 1);
    }
}
