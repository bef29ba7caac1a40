// THEORY:
// The `parallel_pipeline` runs a whole batch: it acquires every logo through an
// `ImageSource`, hashes them on a pool of workers, freezes the results into a
// `FingerprintTable` and clusters it.
//
// Acquisition and hashing are independent per domain, so they run concurrently:
// - Fetches are bounded (`max_concurrent_fetches`) and each one is wrapped in a
//   timeout. Timing out is the same as the logo being unavailable.
// - Hashing is CPU work. A single dispatcher hands tasks round-robin to a fixed
//   set of workers; each worker runs the engine on the blocking thread pool and
//   answers through a oneshot channel.
//
// Results are gathered in domain-list order no matter which fetch finishes
// first, so the table (and therefore the clusterer's anchor choice) does not
// depend on network timing. Clustering itself only starts once every domain has
// been hashed or dropped, and runs on the calling task.

use crate::core_modules::domain::Domain;
use crate::core_modules::fingerprint_engine::FingerprintEngine;
use crate::core_modules::fingerprint_table::FingerprintTable;
use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
use crate::error::{Error, Result};
use crate::pipeline::{
    BatchReport, BatchStats, DomainOutcome, Failure, LogoPipeline, PipelineConfig, collect_outcomes,
    hash_with,
};
use crate::sources::ImageSource;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

pub struct HashTask {
    pub domain: Domain,
    pub grid: PixelGrid,
    pub result_sender: oneshot::Sender<DomainOutcome>,
}

/// A fixed set of hashing workers fed by one round-robin dispatcher.
pub struct HashWorkerPool {
    task_sender: mpsc::UnboundedSender<HashTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl HashWorkerPool {
    /// Spawns the dispatcher and `worker_count` workers. Must be called from
    /// within a Tokio runtime.
    pub fn new(engine: FingerprintEngine, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let engine = Arc::new(engine);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<HashTask>();
        let mut workers = Vec::with_capacity(worker_count + 1);

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<HashTask>())
            .unzip();

        // Spawn dispatcher
        workers.push(tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                // A closed worker drops the task, and with it the reply channel.
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_count;
            }
        }));

        // Spawn workers
        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_engine = Arc::clone(&engine);

            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let HashTask {
                        domain,
                        grid,
                        result_sender,
                    } = task;
                    debug!(domain = %domain, worker = worker_id, "Hashing logo");

                    let engine = Arc::clone(&worker_engine);
                    let outcome = tokio::task::spawn_blocking(move || hash_with(&engine, Ok(grid)))
                        .await
                        .unwrap_or_else(|e| {
                            DomainOutcome::Dropped(Failure::Unreadable(format!("hashing aborted: {e}")))
                        });

                    let _ = result_sender.send(outcome);
                }
            }));
        }

        Self { task_sender, workers }
    }

    /// Hashes one grid on the pool.
    pub async fn hash(&self, domain: Domain, grid: PixelGrid) -> Result<DomainOutcome> {
        let (result_sender, result_receiver) = oneshot::channel();

        let task = HashTask {
            domain,
            grid,
            result_sender,
        };

        self.task_sender
            .send(task)
            .map_err(|_| Error::WorkerPool("failed to send task to worker pool".to_string()))?;

        result_receiver
            .await
            .map_err(|_| Error::WorkerPool("failed to receive result from worker".to_string()))
    }

    /// Stops accepting work and waits for the workers to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// The full batch: acquire, hash, freeze, cluster.
pub struct ParallelPipeline {
    config: PipelineConfig,
    pipeline: LogoPipeline,
}

impl ParallelPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pipeline = LogoPipeline::new(&config)?;
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetches and hashes every domain. The returned table holds the hashed
    /// domains in the order of `domains`.
    pub async fn acquire_and_hash<S>(&self, domains: &[Domain], source: &S) -> Result<(FingerprintTable, BatchStats)>
    where
        S: ImageSource + ?Sized,
    {
        info!(
            domains = domains.len(),
            concurrency = self.config.max_concurrent_fetches,
            hash_workers = self.config.hash_workers,
            timeout_ms = self.config.request_timeout.as_millis() as u64,
            "Acquiring and hashing logos"
        );

        let pool = HashWorkerPool::new(self.pipeline.engine().clone(), self.config.hash_workers);
        let timeout = self.config.request_timeout;

        let outcomes: Vec<(Domain, DomainOutcome)> = stream::iter(domains.iter().cloned())
            .map(|domain| {
                let pool = &pool;
                async move {
                    let acquired = match tokio::time::timeout(timeout, source.fetch(&domain)).await {
                        Ok(acquired) => acquired,
                        Err(_) => Err(Failure::Unavailable(format!(
                            "timed out after {} ms",
                            timeout.as_millis()
                        ))),
                    };
                    let outcome = match acquired {
                        Ok(grid) => pool.hash(domain.clone(), grid).await?,
                        Err(failure) => DomainOutcome::Dropped(failure),
                    };
                    Ok::<_, Error>((domain, outcome))
                }
            })
            .buffered(self.config.max_concurrent_fetches)
            .try_collect()
            .await?;

        pool.shutdown().await;
        Ok(collect_outcomes(outcomes))
    }

    /// Runs the whole batch and returns the partition with failure counts.
    pub async fn run<S>(&self, domains: &[Domain], source: &S) -> Result<BatchReport>
    where
        S: ImageSource + ?Sized,
    {
        let (table, stats) = self.acquire_and_hash(domains, source).await?;
        Ok(self.pipeline.finish(&table, stats))
    }
}
