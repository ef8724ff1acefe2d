//! Infrastructure layer: persistence collaborator, background jobs, CSV
//! import/export, artifact storage, and query caching.

pub mod artifacts;
pub mod cache;
pub mod csv_io;
pub mod jobs;
pub mod seed;
pub mod store;
