use axum::{
    Router,
    routing::{get, post},
};

pub mod jobs;
pub mod persons;
pub mod system;

/// Router for the person resource and its bulk jobs.
pub fn router() -> Router {
    Router::new()
        .route("/persons", get(persons::list_persons).post(persons::create_person))
        .route("/persons/import-csv", post(jobs::submit_import))
        .route("/persons/import-status/:task_id", get(jobs::import_status))
        .route("/persons/export-csv", post(jobs::submit_export))
        .route("/persons/export-status/:task_id", get(jobs::export_status))
        .route("/persons/exports/:file_name", get(jobs::download_export))
        .route(
            "/persons/:id",
            get(persons::get_person)
                .put(persons::replace_person)
                .patch(persons::patch_person)
                .delete(persons::delete_person),
        )
        .route("/persons/:id/ideal-weight", get(persons::ideal_weight))
}
