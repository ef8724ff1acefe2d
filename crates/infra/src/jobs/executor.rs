//! Job executor: a fixed pool of worker threads draining a shared job store.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobKind, JobResult};

/// Job handler function type.
pub type JobHandler = Box<dyn Fn(&Job) -> JobResult + Send + Sync>;

/// Job executor configuration.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// How often idle workers poll for new jobs
    pub poll_interval: Duration,
    /// Number of worker threads
    pub workers: usize,
    /// Name for logging and thread names
    pub name: String,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            workers: 2,
            name: "job-worker".to_string(),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub workers: usize,
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub current_running: usize,
    pub uptime_secs: u64,
}

type SharedStats = Arc<Mutex<ExecutorStats>>;

fn lock_stats(stats: &SharedStats) -> MutexGuard<'_, ExecutorStats> {
    // Counters stay usable even if a worker panicked while holding the lock.
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to control running workers. Dropping it stops them without waiting.
#[derive(Debug)]
pub struct JobExecutorHandle {
    shutdown: Vec<mpsc::Sender<()>>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: SharedStats,
    started: Instant,
}

impl JobExecutorHandle {
    /// Request graceful shutdown and wait for in-flight jobs to finish.
    pub fn shutdown(mut self) {
        self.signal();
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
    }

    fn signal(&mut self) {
        for tx in self.shutdown.drain(..) {
            let _ = tx.send(());
        }
    }

    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        let mut stats = lock_stats(&self.stats).clone();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }
}

impl Drop for JobExecutorHandle {
    fn drop(&mut self) {
        self.signal();
    }
}

/// Outcome of running one claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Succeeded,
    Failed(String),
}

/// Background job executor.
///
/// Workers claim pending jobs from the store, run the handler registered for
/// the job's kind, and persist the terminal status. A missing handler, a
/// handler failure, or a handler panic all end in `Failed`; jobs are never
/// retried.
pub struct JobExecutor<S: JobStore> {
    store: S,
    handlers: HashMap<JobKind, JobHandler>,
}

impl<S: JobStore + 'static> JobExecutor<S> {
    /// Create a new executor with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a job kind, replacing any previous one.
    pub fn register_handler<F>(&mut self, kind: JobKind, handler: F)
    where
        F: Fn(&Job) -> JobResult + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Spawn `config.workers` worker threads sharing this executor.
    pub fn spawn(self, config: JobExecutorConfig) -> std::io::Result<JobExecutorHandle> {
        let executor = Arc::new(self);
        let workers = config.workers.max(1);
        let stats: SharedStats = Arc::new(Mutex::new(ExecutorStats {
            workers,
            ..ExecutorStats::default()
        }));

        let mut handle = JobExecutorHandle {
            shutdown: Vec::with_capacity(workers),
            joins: Vec::with_capacity(workers),
            stats: stats.clone(),
            started: Instant::now(),
        };

        for n in 0..workers {
            let (tx, rx) = mpsc::channel::<()>();
            let executor = executor.clone();
            let stats = stats.clone();
            let name = format!("{}-{}", config.name, n);
            let poll_interval = config.poll_interval;

            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&executor, &name, poll_interval, rx, &stats))?;

            handle.shutdown.push(tx);
            handle.joins.push(join);
        }

        info!(executor = %config.name, workers, "job workers started");
        Ok(handle)
    }

    /// Claim and run the next pending job, if any.
    pub fn run_next(&self) -> Result<Option<(Job, Execution)>, JobStoreError> {
        match self.store.claim_next()? {
            Some(mut job) => {
                let outcome = self.execute_one(&mut job)?;
                Ok(Some((job, outcome)))
            }
            None => Ok(None),
        }
    }

    /// Run pending jobs on the calling thread until the queue is empty.
    pub fn run_pending(&self) -> Result<usize, JobStoreError> {
        let mut processed = 0;
        while self.run_next()?.is_some() {
            processed += 1;
        }
        Ok(processed)
    }

    /// Execute a claimed (running) job and persist its terminal status.
    pub fn execute_one(&self, job: &mut Job) -> Result<Execution, JobStoreError> {
        let outcome = match self.handlers.get(&job.kind) {
            None => JobResult::Failure(format!("no handler for job kind: {}", job.kind)),
            Some(handler) => {
                let view: &Job = job;
                panic::catch_unwind(AssertUnwindSafe(|| handler(view))).unwrap_or_else(|cause| {
                    JobResult::Failure(format!("job handler panicked: {}", panic_message(&cause)))
                })
            }
        };

        let execution = match outcome {
            JobResult::Success(output) => {
                job.mark_succeeded(output)
                    .map_err(|e| JobStoreError::InvalidTransition(job.id, e))?;
                Execution::Succeeded
            }
            JobResult::Failure(message) => {
                job.mark_failed(message.clone())
                    .map_err(|e| JobStoreError::InvalidTransition(job.id, e))?;
                Execution::Failed(message)
            }
        };

        self.store.update(job)?;
        Ok(execution)
    }
}

fn panic_message(cause: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn worker_loop<S: JobStore + 'static>(
    executor: &JobExecutor<S>,
    name: &str,
    poll_interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
    stats: &SharedStats,
) {
    debug!(worker = %name, "job worker started");

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
            Err(mpsc::TryRecvError::Empty) => {}
        }

        match executor.store.claim_next() {
            Ok(Some(mut job)) => {
                debug!(worker = %name, job_id = %job.id, kind = %job.kind, "claimed job");
                lock_stats(stats).current_running += 1;

                let result = executor.execute_one(&mut job);

                {
                    let mut s = lock_stats(stats);
                    s.current_running = s.current_running.saturating_sub(1);
                    s.jobs_processed += 1;
                    match &result {
                        Ok(Execution::Succeeded) => s.jobs_succeeded += 1,
                        Ok(Execution::Failed(_)) | Err(_) => s.jobs_failed += 1,
                    }
                }

                match result {
                    Ok(Execution::Succeeded) => info!(
                        worker = %name,
                        job_id = %job.id,
                        kind = %job.kind,
                        duration_ms = job.duration_ms().unwrap_or_default(),
                        "job succeeded"
                    ),
                    Ok(Execution::Failed(reason)) => warn!(
                        worker = %name,
                        job_id = %job.id,
                        kind = %job.kind,
                        error = %reason,
                        "job failed"
                    ),
                    Err(e) => error!(
                        worker = %name,
                        job_id = %job.id,
                        status = %job.status.as_str(),
                        error = %e,
                        "failed to record job outcome"
                    ),
                }
            }
            Ok(None) => {
                // Idle; wake early on shutdown.
                match shutdown_rx.recv_timeout(poll_interval) {
                    Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(mpsc::RecvTimeoutError::Timeout) => {}
                }
            }
            Err(e) => {
                error!(worker = %name, error = %e, "failed to claim job");
                thread::sleep(poll_interval);
            }
        }
    }

    debug!(worker = %name, "job worker stopped");
}
