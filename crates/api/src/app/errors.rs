use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use roster_core::{DomainError, FieldErrors};
use roster_infra::artifacts::ArtifactError;
use roster_infra::jobs::JobStoreError;
use roster_infra::store::StoreError;

pub const NOT_FOUND: &str = "not found";

/// `{"detail": ...}` body with the given status.
pub fn detail_error(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

pub fn not_found() -> Response {
    detail_error(StatusCode::NOT_FOUND, NOT_FOUND)
}

/// 400 with the field -> message map as the body.
pub fn validation_error(errors: FieldErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
}

pub fn internal_error(message: impl std::fmt::Display) -> Response {
    tracing::error!(error = %message, "internal error");
    detail_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(errors) => validation_error(errors),
        // Malformed ids cannot name an existing record.
        DomainError::NotFound | DomainError::InvalidId(_) => not_found(),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    if let Some(errors) = err.as_field_errors() {
        return domain_error_to_response(errors.into());
    }
    match err {
        StoreError::NotFound(_) => domain_error_to_response(DomainError::not_found()),
        other => internal_error(other),
    }
}

pub fn job_store_error_to_response(err: JobStoreError) -> Response {
    match err {
        JobStoreError::NotFound(_) => not_found(),
        other => internal_error(other),
    }
}

pub fn artifact_error_to_response(err: ArtifactError) -> Response {
    match err {
        ArtifactError::InvalidName(_) => not_found(),
        other => internal_error(other),
    }
}

pub fn json_rejection(rejection: JsonRejection) -> Response {
    detail_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> Response {
    detail_error(StatusCode::BAD_REQUEST, rejection.body_text())
}
