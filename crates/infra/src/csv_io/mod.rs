//! CSV import/export and the job handlers that run them.

pub mod export;
pub mod import;

use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::jobs::{Job, JobExecutor, JobKind, JobOutput, JobResult, JobStore};
use crate::store::PersonStore;

pub use export::{EXPORT_COLUMNS, ExportError, export_csv, export_file_name, render_csv};
pub use import::{ImportError, REQUIRED_COLUMNS, import_csv};

/// Wire the import and export handlers into `executor`.
pub fn register_handlers<J, P, A>(executor: &mut JobExecutor<J>, persons: Arc<P>, artifacts: Arc<A>)
where
    J: JobStore + 'static,
    P: PersonStore + ?Sized + 'static,
    A: ArtifactStore + ?Sized + 'static,
{
    let import_store = persons.clone();
    executor.register_handler(JobKind::Import, move |job: &Job| {
        let Some(text) = job.payload.get("csv").and_then(|v| v.as_str()) else {
            return JobResult::Failure("import payload has no csv text".to_string());
        };
        match import_csv(text, &*import_store) {
            Ok(report) => JobResult::Success(JobOutput::Import(report)),
            Err(e) => JobResult::Failure(e.to_string()),
        }
    });

    executor.register_handler(JobKind::Export, move |job: &Job| {
        match export_csv(job.id, &*persons, &*artifacts) {
            Ok(artifact) => JobResult::Success(JobOutput::Export(artifact)),
            Err(e) => JobResult::Failure(e.to_string()),
        }
    });
}
