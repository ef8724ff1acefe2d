use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};
use serde_json::json;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.jobs.stats() {
        Ok(jobs) => Json(json!({
            "status": "ok",
            "jobs": jobs,
            "workers": services.worker_stats(),
        }))
        .into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}
