//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, job workers, list cache
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Router over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(Extension(services)),
        )
}

/// Build services (starting the job workers) and the full HTTP router.
///
/// Workers stop once the router and every clone of it are dropped.
pub fn build_app(config: ApiConfig) -> anyhow::Result<Router> {
    Ok(router(build_services(config)?))
}
