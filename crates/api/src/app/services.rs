//! Service wiring: stores, job workers, and the list cache.

use std::sync::{Arc, Mutex};

use anyhow::Context;

use roster_infra::artifacts::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
use roster_infra::cache::QueryCache;
use roster_infra::csv_io;
use roster_infra::jobs::{
    ExecutorStats, InMemoryJobStore, JobExecutor, JobExecutorConfig, JobExecutorHandle, JobStore,
};
use roster_infra::seed;
use roster_infra::store::{InMemoryPersonStore, PersonStore, StoreError};
use roster_persons::{Person, SearchFilter};

use crate::config::{ApiConfig, ArtifactBackend};

/// Page size bounds for list endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

pub struct AppServices {
    pub persons: Arc<dyn PersonStore>,
    pub jobs: Arc<dyn JobStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub page_limits: PageLimits,
    list_cache: QueryCache<Arc<Vec<Person>>>,
    workers: Mutex<Option<JobExecutorHandle>>,
}

impl AppServices {
    /// Filtered, ordered records for `filter`, served from the list cache
    /// while no write has happened since it was filled.
    pub fn search(&self, filter: &SearchFilter) -> Result<Arc<Vec<Person>>, StoreError> {
        // Revision is read first so a concurrent write can only make the entry stale.
        let revision = self.persons.revision();
        self.list_cache
            .get_or_try_insert_with(&filter.cache_key(), revision, || {
                Ok(Arc::new(filter.apply(self.persons.list()?)))
            })
    }

    pub fn worker_stats(&self) -> Option<ExecutorStats> {
        self.workers
            .lock()
            .ok()
            .and_then(|w| w.as_ref().map(JobExecutorHandle::stats))
    }

    /// Stop the job workers, waiting for in-flight jobs. Blocks.
    pub fn shutdown_workers(&self) {
        let handle = self.workers.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            handle.shutdown();
            tracing::info!("job workers stopped");
        }
    }
}

/// Build stores, optional seed data, and start the job workers.
pub fn build_services(config: ApiConfig) -> anyhow::Result<Arc<AppServices>> {
    let persons: Arc<dyn PersonStore> = InMemoryPersonStore::arc();
    let jobs: Arc<dyn JobStore> = InMemoryJobStore::arc();
    let artifacts: Arc<dyn ArtifactStore> = match &config.artifacts {
        ArtifactBackend::Filesystem(dir) => Arc::new(FsArtifactStore::new(dir.clone())),
        ArtifactBackend::InMemory => Arc::new(InMemoryArtifactStore::new()),
    };

    if config.seed_persons > 0 {
        let created = seed::seed_store(&*persons, config.seed_persons, &mut rand::thread_rng())
            .context("failed to seed person store")?;
        tracing::info!(created, "seed data loaded");
    }

    let mut executor = JobExecutor::new(jobs.clone());
    csv_io::register_handlers(&mut executor, persons.clone(), artifacts.clone());
    let workers = executor
        .spawn(
            JobExecutorConfig::default()
                .with_name("roster-worker")
                .with_workers(config.workers)
                .with_poll_interval(config.poll_interval),
        )
        .context("failed to spawn job workers")?;

    Ok(Arc::new(AppServices {
        persons,
        jobs,
        artifacts,
        page_limits: PageLimits {
            default_size: config.page_size,
            max_size: config.max_page_size,
        },
        list_cache: QueryCache::new(config.list_cache_ttl),
        workers: Mutex::new(Some(workers)),
    }))
}
