use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path},
    http::{StatusCode, header},
    response::IntoResponse,
};

use roster_core::JobId;
use roster_infra::jobs::{Job, JobKind, JobStatusView};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

type Response = axum::response::Response;

const UTF8_BOM: &str = "\u{feff}";

fn enqueue(services: &AppServices, job: Job, message: &'static str) -> Response {
    let kind = job.kind;
    match services.jobs.enqueue(job) {
        Ok(task_id) => {
            tracing::info!(job_id = %task_id, %kind, "job enqueued");
            (StatusCode::ACCEPTED, Json(dto::JobAccepted { task_id, message })).into_response()
        }
        Err(e) => errors::job_store_error_to_response(e),
    }
}

/// Status of a job of `kind`; ids of other kinds are not found.
fn job_view(services: &AppServices, raw_id: &str, kind: JobKind) -> Result<JobStatusView, Response> {
    let job_id: JobId = raw_id.parse().map_err(errors::domain_error_to_response)?;
    match services.jobs.get_status(job_id) {
        Ok(Some(view)) if view.kind == kind => Ok(view),
        Ok(_) => Err(errors::not_found()),
        Err(e) => Err(errors::job_store_error_to_response(e)),
    }
}

/// Accept an uploaded CSV (raw request body) and queue it for import.
pub async fn submit_import(Extension(services): Extension<Arc<AppServices>>, body: Bytes) -> Response {
    if body.is_empty() {
        return errors::detail_error(StatusCode::BAD_REQUEST, "No file uploaded.");
    }
    let Ok(text) = std::str::from_utf8(&body) else {
        return errors::detail_error(StatusCode::BAD_REQUEST, "File must be UTF-8 encoded text.");
    };
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    enqueue(&services, Job::import(text), "CSV import started.")
}

pub async fn import_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(task_id): Path<String>,
) -> Response {
    match job_view(&services, &task_id, JobKind::Import) {
        Ok(view) => Json(dto::import_status_to_json(&view)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn submit_export(Extension(services): Extension<Arc<AppServices>>) -> Response {
    enqueue(&services, Job::export(), "CSV export started.")
}

pub async fn export_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(task_id): Path<String>,
) -> Response {
    match job_view(&services, &task_id, JobKind::Export) {
        Ok(view) => Json(dto::export_status_to_json(&view)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn download_export(
    Extension(services): Extension<Arc<AppServices>>,
    Path(file_name): Path<String>,
) -> Response {
    // Filesystem reads stay off the async runtime.
    let artifacts = services.artifacts.clone();
    let name = file_name.clone();
    let fetched = match tokio::task::spawn_blocking(move || artifacts.get(&name)).await {
        Ok(fetched) => fetched,
        Err(e) => return errors::internal_error(e),
    };

    match fetched {
        Ok(Some(bytes)) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => errors::not_found(),
        Err(e) => errors::artifact_error_to_response(e),
    }
}
