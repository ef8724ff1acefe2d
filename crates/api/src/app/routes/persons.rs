use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use roster_core::PersonId;
use roster_persons::{Person, PersonInput, SearchFilter};

use crate::app::services::{AppServices, PageLimits};
use crate::app::{dto, errors};

type Response = axum::response::Response;

const INVALID_PAGE: &str = "Invalid page.";

fn parse_id(raw: &str) -> Result<PersonId, Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

fn load(services: &AppServices, id: PersonId) -> Result<Person, Response> {
    match services.persons.get(id) {
        Ok(Some(person)) => Ok(person),
        Ok(None) => Err(errors::not_found()),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// 1-based page of `records`, with `page`/`page_size` taken from the query.
pub fn paginate(
    records: &[Person],
    params: &[(String, String)],
    limits: PageLimits,
) -> Result<dto::PageResponse, Response> {
    let param = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.trim());

    let page = match param("page") {
        None | Some("") => 1,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => return Err(errors::detail_error(StatusCode::NOT_FOUND, INVALID_PAGE)),
        },
    };
    // Bad sizes fall back to the default; large ones are clamped.
    let page_size = param("page_size")
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|&n| n >= 1)
        .map_or(limits.default_size, |n| n.min(limits.max_size));

    let count = records.len();
    let pages = count.div_ceil(page_size).max(1);
    if page > pages {
        return Err(errors::detail_error(StatusCode::NOT_FOUND, INVALID_PAGE));
    }

    let results = records
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(dto::person_to_json)
        .collect();

    Ok(dto::PageResponse {
        count,
        page,
        page_size,
        results,
    })
}

pub async fn list_persons(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let Query(params) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection(rejection),
    };

    let filter = match SearchFilter::from_params(params.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(f) => f,
        Err(field_errors) => return errors::validation_error(field_errors),
    };

    let records = match services.search(&filter) {
        Ok(r) => r,
        Err(e) => return errors::store_error_to_response(e),
    };

    match paginate(&records, &params, services.page_limits) {
        Ok(page) => Json(page).into_response(),
        Err(resp) => resp,
    }
}

pub async fn create_person(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> Response {
    let Json(input) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    let fields = match input.validate() {
        Ok(f) => f,
        Err(field_errors) => return errors::validation_error(field_errors),
    };

    match services.persons.insert(fields) {
        Ok(person) => {
            tracing::info!(person_id = %person.id, "person created");
            (StatusCode::CREATED, Json(dto::person_to_json(&person))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_person(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let person = match parse_id(&id).and_then(|id| load(&services, id)) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    Json(dto::person_to_json(&person)).into_response()
}

/// Full update: every field must be supplied.
pub async fn replace_person(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> Response {
    update(&services, &id, body, false)
}

/// Partial update: supplied fields are merged over the stored record.
pub async fn patch_person(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> Response {
    update(&services, &id, body, true)
}

fn update(
    services: &AppServices,
    id: &str,
    body: Result<Json<PersonInput>, JsonRejection>,
    partial: bool,
) -> Response {
    let current = match parse_id(id).and_then(|id| load(services, id)) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Json(input) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    let validated = if partial {
        input.merge_into(&current.fields())
    } else {
        input.validate()
    };
    let fields = match validated {
        Ok(f) => f,
        Err(field_errors) => return errors::validation_error(field_errors),
    };

    match services.persons.update(current.id, fields) {
        Ok(person) => {
            tracing::info!(person_id = %person.id, partial, "person updated");
            Json(dto::person_to_json(&person)).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_person(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match services.persons.delete(id) {
        Ok(()) => {
            tracing::info!(person_id = %id, "person deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn ideal_weight(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match parse_id(&id).and_then(|id| load(&services, id)) {
        Ok(person) => Json(json!({ "ideal_weight": person.ideal_weight().to_f64() })).into_response(),
        Err(resp) => resp,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use roster_persons::{Centi, Cpf, PersonFields, Sex};

    const LIMITS: PageLimits = PageLimits {
        default_size: 2,
        max_size: 3,
    };

    fn people(n: usize) -> Vec<Person> {
        let cpfs = ["11144477735", "52998224725", "39053344705", "12345678909", "98765432100"];
        (0..n)
            .map(|i| {
                Person::new(
                    PersonId::new(),
                    PersonFields {
                        name: format!("P{i}"),
                        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                        cpf: Cpf::parse(cpfs[i]).unwrap(),
                        sex: Sex::Female,
                        height: Centi::from_hundredths(160),
                        weight: Centi::from_hundredths(5500),
                    },
                    Utc::now(),
                )
            })
            .collect()
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn pages_and_clamps() {
        let records = people(5);

        let first = paginate(&records, &params(&[]), LIMITS).unwrap();
        assert_eq!((first.count, first.page, first.page_size, first.results.len()), (5, 1, 2, 2));

        let last = paginate(&records, &params(&[("page", "3")]), LIMITS).unwrap();
        assert_eq!(last.results.len(), 1);
        assert_eq!(last.results[0]["name"], "P4");

        let clamped = paginate(&records, &params(&[("page_size", "50")]), LIMITS).unwrap();
        assert_eq!(clamped.page_size, 3);

        let fallback = paginate(&records, &params(&[("page_size", "abc")]), LIMITS).unwrap();
        assert_eq!(fallback.page_size, 2);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        let records = people(3);
        for page in ["0", "3", "x", "-1"] {
            let resp = paginate(&records, &params(&[("page", page)]), LIMITS).unwrap_err();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "page={page}");
        }
        // An empty collection still has a first page.
        let empty = paginate(&[], &params(&[]), LIMITS).unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.results.is_empty());
    }
}
