use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::{Value, json};

use roster_core::JobId;
use roster_infra::jobs::{JobOutput, JobStatusView};
use roster_persons::Person;

// -------------------------
// Response DTOs
// -------------------------

pub fn person_to_json(person: &Person) -> Value {
    json!({
        "id": person.id.to_string(),
        "name": person.name,
        "date_of_birth": person.date_of_birth.to_string(),
        "cpf": person.cpf.as_str(),
        "sex": person.sex.code(),
        "height": person.height.to_string(),
        "weight": person.weight.to_string(),
        "ideal_weight": person.ideal_weight().to_f64(),
        "created_at": person.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        "updated_at": person.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    })
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub task_id: JobId,
    pub message: &'static str,
}

pub fn import_status_to_json(view: &JobStatusView) -> Value {
    let result = match &view.output {
        Some(JobOutput::Import(report)) => json!({
            "created": report.created,
            "errors": report.errors,
        }),
        _ => Value::Null,
    };
    status_json(view, "result", result)
}

pub fn export_status_to_json(view: &JobStatusView) -> Value {
    let file_url = match &view.output {
        Some(JobOutput::Export(artifact)) => json!(export_url(&artifact.file_name)),
        _ => Value::Null,
    };
    status_json(view, "file_url", file_url)
}

pub fn export_url(file_name: &str) -> String {
    format!("/persons/exports/{file_name}")
}

fn status_json(view: &JobStatusView, key: &str, value: Value) -> Value {
    let mut body = json!({
        "task_id": view.id.to_string(),
        "status": view.status.as_str(),
    });
    body[key] = value;
    if let Some(error) = &view.error {
        body["error"] = json!(error);
    }
    body
}
