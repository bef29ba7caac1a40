// THEORY:
// The `pipeline` module is the top-level, synchronous API of the engine. It ties
// the Fingerprint Engine and the Similarity Clusterer together and defines the
// vocabulary every batch speaks: what happened to each domain (`DomainOutcome`),
// why a domain was dropped (`Failure`), and what the batch produced
// (`BatchReport`).
//
// A per-domain failure is never an error of the batch. It is a tagged value that
// gets counted and logged, and the domain is left out of the `FingerprintTable`.
// Only configuration and I/O problems outside the per-domain work abort a run.
//
// `LogoPipeline` works on grids that are already decoded. The networked,
// concurrent variant lives in `parallel_pipeline` and reuses everything here.

use crate::core_modules::clusterer::{ClusterConfig, Partition, SimilarityClusterer};
use crate::core_modules::domain::Domain;
use crate::core_modules::fingerprint::Fingerprint;
use crate::core_modules::fingerprint_engine::{FingerprintConfig, FingerprintEngine};
use crate::core_modules::fingerprint_table::FingerprintTable;
use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::clusterer::Group;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fingerprint: FingerprintConfig,
    pub cluster: ClusterConfig,
    /// Upper bound for acquiring one logo. Hitting it counts as "unavailable".
    pub request_timeout: Duration,
    /// How many logos may be in flight at once.
    pub max_concurrent_fetches: usize,
    /// Number of hashing workers.
    pub hash_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fingerprint: FingerprintConfig::default(),
            cluster: ClusterConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            hash_workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.fingerprint.validate()?;
        self.cluster.validate()?;
        if self.max_concurrent_fetches == 0 {
            return Err(Error::InvalidConfig {
                name: "max_concurrent_fetches",
                message: "must be at least 1".to_string(),
            });
        }
        if self.hash_workers == 0 {
            return Err(Error::InvalidConfig {
                name: "hash_workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                name: "request_timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Why a domain was dropped from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Fetch failed, timed out, or the server answered with a non-success status.
    Unavailable(String),
    /// The bytes did not form a usable bitmap.
    Unreadable(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Unavailable(reason) => write!(f, "unavailable: {reason}"),
            Failure::Unreadable(reason) => write!(f, "unreadable: {reason}"),
        }
    }
}

/// What happened to a single domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    Hashed(Fingerprint),
    Dropped(Failure),
}

/// Per-batch counters, reported to the surrounding tooling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub domains: usize,
    pub hashed: usize,
    pub unavailable: usize,
    pub unreadable: usize,
}

impl BatchStats {
    fn record(&mut self, outcome: &DomainOutcome) {
        self.domains += 1;
        match outcome {
            DomainOutcome::Hashed(_) => self.hashed += 1,
            DomainOutcome::Dropped(Failure::Unavailable(_)) => self.unavailable += 1,
            DomainOutcome::Dropped(Failure::Unreadable(_)) => self.unreadable += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.unavailable + self.unreadable
    }
}

/// The final output of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub partition: Partition,
    pub stats: BatchStats,
}

/// Folds per-domain outcomes, in order, into a fingerprint table. Failures are
/// logged and counted, never inserted.
pub fn collect_outcomes<I>(outcomes: I) -> (FingerprintTable, BatchStats)
where
    I: IntoIterator<Item = (Domain, DomainOutcome)>,
{
    let outcomes = outcomes.into_iter();
    let mut table = FingerprintTable::with_capacity(outcomes.size_hint().0);
    let mut stats = BatchStats::default();

    for (domain, outcome) in outcomes {
        stats.record(&outcome);
        match outcome {
            DomainOutcome::Hashed(fingerprint) => {
                debug!(domain = %domain, fingerprint = %fingerprint, "Hashed logo");
                if let Err(e) = table.insert(domain, fingerprint) {
                    warn!(error = %e, "Skipping repeated domain");
                }
            }
            DomainOutcome::Dropped(failure) => {
                warn!(domain = %domain, reason = %failure, "Dropping domain");
            }
        }
    }

    (table, stats)
}

/// The synchronous engine: fingerprints decoded grids, then clusters them.
pub struct LogoPipeline {
    engine: FingerprintEngine,
    clusterer: SimilarityClusterer,
}

impl LogoPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: FingerprintEngine::new(config.fingerprint.clone())?,
            clusterer: SimilarityClusterer::new(config.cluster.clone())?,
        })
    }

    pub fn engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    pub fn clusterer(&self) -> &SimilarityClusterer {
        &self.clusterer
    }

    /// Hashes one acquired logo, turning hashing problems into `Unreadable`.
    pub fn hash(&self, acquired: std::result::Result<PixelGrid, Failure>) -> DomainOutcome {
        hash_with(&self.engine, acquired)
    }

    /// Builds the fingerprint table from acquired logos, in input order.
    pub fn fingerprint_table<I>(&self, acquired: I) -> (FingerprintTable, BatchStats)
    where
        I: IntoIterator<Item = (Domain, std::result::Result<PixelGrid, Failure>)>,
    {
        collect_outcomes(
            acquired
                .into_iter()
                .map(|(domain, grid)| (domain, self.hash(grid))),
        )
    }

    /// Fingerprints and clusters a finite batch of acquired logos.
    pub fn run_on_grids<I>(&self, acquired: I) -> BatchReport
    where
        I: IntoIterator<Item = (Domain, std::result::Result<PixelGrid, Failure>)>,
    {
        let (table, stats) = self.fingerprint_table(acquired);
        self.finish(&table, stats)
    }

    /// Clusters a frozen table and logs the batch summary.
    pub fn finish(&self, table: &FingerprintTable, stats: BatchStats) -> BatchReport {
        info!(domains = table.len(), threshold = self.clusterer.threshold(), "Grouping similar logos");
        let partition = self.clusterer.cluster(table);
        info!(
            domains = stats.domains,
            hashed = stats.hashed,
            unavailable = stats.unavailable,
            unreadable = stats.unreadable,
            groups = partition.len(),
            "Batch complete"
        );
        BatchReport { partition, stats }
    }
}

pub(crate) fn hash_with(
    engine: &FingerprintEngine,
    acquired: std::result::Result<PixelGrid, Failure>,
) -> DomainOutcome {
    match acquired {
        Ok(grid) => match engine.fingerprint(&grid) {
            Ok(fingerprint) => DomainOutcome::Hashed(fingerprint),
            Err(e) => DomainOutcome::Dropped(Failure::Unreadable(e.to_string())),
        },
        Err(failure) => DomainOutcome::Dropped(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn logo(seed: u32) -> PixelGrid {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            let v = ((x * (seed + 3) + y * (seed * 7 + 1)) % 256) as u8;
            Rgba([v, v.wrapping_mul(3), 255 - v, 255])
        });
        PixelGrid::from_image(DynamicImage::ImageRgba8(img))
    }

    #[test]
    fn failures_are_counted_and_left_out() {
        let pipeline = LogoPipeline::new(&PipelineConfig::default()).unwrap();
        let report = pipeline.run_on_grids(vec![
            (Domain::from("a.com"), Ok(logo(1))),
            (Domain::from("gone.com"), Err(Failure::Unavailable("HTTP 404".into()))),
            (Domain::from("b.com"), Ok(logo(1))),
            (
                Domain::from("blank.com"),
                Ok(PixelGrid::from_rgba(0, 0, Vec::new()).unwrap()),
            ),
        ]);

        assert_eq!(
            report.stats,
            BatchStats { domains: 4, hashed: 2, unavailable: 1, unreadable: 1 }
        );
        assert_eq!(report.partition.to_nested(), vec![vec!["a.com", "b.com"]]);
    }

    #[test]
    fn nothing_hashed_is_a_valid_empty_result() {
        let pipeline = LogoPipeline::new(&PipelineConfig::default()).unwrap();
        let report = pipeline.run_on_grids(vec![(
            Domain::from("gone.com"),
            Err(Failure::Unavailable("timed out".into())),
        )]);
        assert!(report.partition.is_empty());
        assert_eq!(report.stats.dropped(), 1);
    }

    #[test]
    fn table_follows_input_order() {
        let pipeline = LogoPipeline::new(&PipelineConfig::default()).unwrap();
        let (table, _) = pipeline.fingerprint_table(vec![
            (Domain::from("z.com"), Ok(logo(2))),
            (Domain::from("a.com"), Ok(logo(5))),
        ]);
        let order: Vec<&str> = table.domains().map(Domain::as_str).collect();
        assert_eq!(order, ["z.com", "a.com"]);
    }

    #[test]
    fn rejects_zero_workers() {
        let config = PipelineConfig { hash_workers: 0, ..PipelineConfig::default() };
        assert!(LogoPipeline::new(&config).is_err());
    }

    #[test]
    fn failure_display_carries_reason() {
        assert_eq!(Failure::Unreadable("bad png".into()).to_string(), "unreadable: bad png");
    }
}
