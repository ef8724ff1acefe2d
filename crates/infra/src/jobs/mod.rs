//! Background job system.
//!
//! Submitting a job only records it as `Pending` and returns its id; a pool of
//! worker threads claims jobs in FIFO order and runs the handler registered
//! for the job's kind. Status moves `Pending -> Running -> Succeeded | Failed`
//! and never backwards. Jobs are not retried.

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{ExecutorStats, Execution, JobExecutor, JobExecutorConfig, JobExecutorHandle};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use types::{
    ExportArtifact, ImportReport, InvalidTransition, Job, JobKind, JobOutput, JobResult,
    JobStatus, JobStatusView,
};
