//! Collection coordinator - one collection cycle over the endpoint catalog
//!
//! This module ties the pieces of a run together:
//! - Opening the store and building the shared client and limiter
//! - Resolving every endpoint descriptor to a URL
//! - Spawning one task per endpoint under a concurrency cap
//! - Writing raw events for successful payloads
//! - Aggregating per-endpoint results into a run summary

use crate::collector::fetcher::{build_http_client, FetchResult, Fetcher};
use crate::collector::limiter::RateLimiter;
use crate::config::{validate, Config};
use crate::endpoint::{build_catalog, resolve_url, EndpointDescriptor};
use crate::storage::{RawEvent, SqliteStorage, Storage, StorageError};
use crate::CollectorError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Counts for one collection cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Descriptors in the catalog
    pub total: usize,
    /// Endpoints whose payload was stored
    pub succeeded: usize,
    /// Endpoints fetched without a stored payload
    pub failed: usize,
    /// Endpoints whose URL could not be resolved
    pub skipped: usize,
    pub elapsed: Duration,
}

/// Final state of one endpoint task
enum TaskOutcome {
    Stored,
    NotStored,
}

/// Runs collection cycles against one store
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    fetcher: Fetcher,
    semaphore: Arc<Semaphore>,
}

impl Coordinator {
    /// Creates a coordinator backed by the configured SQLite database
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Store opened and client built
    /// * `Err(CollectorError)` - Invalid config, unusable store, or client failure
    pub fn new(config: Config) -> Result<Self, CollectorError> {
        validate(&config)?;
        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
        tracing::info!("Opened store at {}", config.storage.database_path);
        Self::with_storage(config, Arc::new(storage))
    }

    /// Creates a coordinator writing to an existing store
    pub fn with_storage(config: Config, storage: Arc<dyn Storage>) -> Result<Self, CollectorError> {
        validate(&config)?;
        let limiter = Arc::new(RateLimiter::new(config.collector.requests_per_second)?);
        let client = build_http_client(&config.collector, config.auth.as_ref())?;
        let fetcher = Fetcher::new(
            client,
            limiter,
            Arc::clone(&storage),
            config.collector.max_retries,
            config.backoff.clone(),
        );
        let semaphore = Arc::new(Semaphore::new(config.collector.max_concurrency.max(1) as usize));

        Ok(Self {
            config: Arc::new(config),
            storage,
            fetcher,
            semaphore,
        })
    }

    /// Store this coordinator writes to
    pub fn storage(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.storage)
    }

    /// Runs one collection cycle over `catalog`
    ///
    /// A failing endpoint never aborts the others. A store write failure is
    /// fatal: the first one is returned once every in-flight task has
    /// finished.
    pub async fn run(&self, catalog: &[EndpointDescriptor]) -> Result<RunSummary, CollectorError> {
        let start_time = Instant::now();
        let mut summary = RunSummary {
            total: catalog.len(),
            ..RunSummary::default()
        };

        tracing::info!(
            "Starting collection of {} endpoints (concurrency {}, {} req/s)",
            catalog.len(),
            self.config.collector.max_concurrency,
            self.config.collector.requests_per_second
        );

        let mut tasks = JoinSet::new();

        for descriptor in catalog {
            let url = match resolve_url(&self.config.collector.base_url, descriptor) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping endpoint: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let name = descriptor.name.clone();
            let fetcher = self.fetcher.clone();
            let storage = Arc::clone(&self.storage);
            let semaphore = Arc::clone(&self.semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| StorageError::Database(format!("concurrency gate closed: {}", e)))?;
                collect_endpoint(&fetcher, storage.as_ref(), &name, &url).await
            });
        }

        let mut fatal: Option<StorageError> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(TaskOutcome::Stored)) => summary.succeeded += 1,
                Ok(Ok(TaskOutcome::NotStored)) => summary.failed += 1,
                Ok(Err(e)) => {
                    tracing::error!("Store write failed: {}", e);
                    summary.failed += 1;
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!("Collection task panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary.elapsed = start_time.elapsed();

        if let Some(e) = fatal {
            return Err(CollectorError::Storage(e));
        }

        tracing::info!(
            "Collection completed: {}/{} stored, {} failed, {} skipped in {:?}",
            summary.succeeded,
            summary.total,
            summary.failed,
            summary.skipped,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Fetches one endpoint and stores its payload on success
async fn collect_endpoint(
    fetcher: &Fetcher,
    storage: &dyn Storage,
    name: &str,
    url: &str,
) -> Result<TaskOutcome, StorageError> {
    match fetcher.fetch_with_retry(name, url).await? {
        FetchResult::Success { payload, attempts } => {
            let event = RawEvent::new(name, url, &payload)?;
            storage.insert_event(&event)?;
            tracing::debug!("{}: stored payload after {} attempt(s)", name, attempts);
            Ok(TaskOutcome::Stored)
        }
        FetchResult::AuthRejected { status, attempts } => {
            tracing::debug!("{}: auth rejected ({}) after {} attempt(s)", name, status, attempts);
            Ok(TaskOutcome::NotStored)
        }
        FetchResult::TerminalFailure {
            error,
            attempts,
            exhausted,
        } => {
            if exhausted {
                tracing::warn!("{}: giving up after {} attempts, last error {}", name, attempts, error);
            }
            Ok(TaskOutcome::NotStored)
        }
    }
}

/// Runs one collection cycle for a configuration
///
/// Builds the catalog from `config`, opens the configured store and runs
/// every endpoint once.
///
/// # Returns
///
/// * `Ok(RunSummary)` - The cycle completed (individual endpoints may have failed)
/// * `Err(CollectorError)` - Setup failed or the store became unwritable
pub async fn run_collection(config: Config) -> Result<RunSummary, CollectorError> {
    let catalog = build_catalog(&config);
    let coordinator = Coordinator::new(config)?;
    coordinator.run(&catalog).await
}
