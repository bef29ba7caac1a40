use anyhow::{Context, Result};
use clap::Parser;
use logo_cluster::domain_list;
use logo_cluster::parallel_pipeline::ParallelPipeline;
use logo_cluster::pipeline::PipelineConfig;
use logo_cluster::result_sink::{DEFAULT_RESULT_FILE, JsonFileSink, ResultSink};
use logo_cluster::sources::{
    ArchivingImageSource, DEFAULT_LOGO_URL_TEMPLATE, DirectoryImageSource, HttpImageSource, ImageSource,
};
use logo_cluster::{ClusterConfig, FingerprintConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "logo_grouper")]
#[command(about = "Group website domains by the visual similarity of their logos")]
struct Args {
    /// Domain list with a `domain` column (`.parquet` or comma-separated text)
    #[arg(env = "LOGO_DOMAINS")]
    input: PathBuf,

    /// Where to write the JSON groups
    #[arg(short, long, env = "LOGO_OUTPUT", default_value = DEFAULT_RESULT_FILE)]
    output: PathBuf,

    /// Maximum differing bits between a group's first logo and any other member
    #[arg(short, long, env = "LOGO_THRESHOLD", default_value_t = 10)]
    threshold: u32,

    /// Side of the square every logo is resampled to before hashing
    #[arg(long, env = "LOGO_CANONICAL_SIZE", default_value_t = 128)]
    canonical_size: u32,

    /// Per-logo download timeout in seconds
    #[arg(long, env = "LOGO_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Logos fetched at the same time
    #[arg(short, long, env = "LOGO_CONCURRENCY", default_value_t = 16)]
    concurrency: usize,

    /// Hashing workers (defaults to the number of CPUs)
    #[arg(long, env = "LOGO_HASH_WORKERS")]
    hash_workers: Option<usize>,

    /// Logo URL template; `{domain}` is replaced by each domain
    #[arg(long, env = "LOGO_URL_TEMPLATE", default_value = DEFAULT_LOGO_URL_TEMPLATE)]
    url_template: String,

    /// Keep a PNG copy of every downloaded logo in this directory
    #[arg(long, env = "LOGO_ARCHIVE_DIR", conflicts_with = "from_dir")]
    archive_dir: Option<PathBuf>,

    /// Read logos from a previously archived directory instead of downloading
    #[arg(long, env = "LOGO_FROM_DIR")]
    from_dir: Option<PathBuf>,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            fingerprint: FingerprintConfig {
                canonical_size: self.canonical_size,
                ..FingerprintConfig::default()
            },
            cluster: ClusterConfig {
                similarity_threshold: self.threshold,
            },
            request_timeout: Duration::from_secs(self.timeout_secs),
            max_concurrent_fetches: self.concurrency,
            hash_workers: self.hash_workers.unwrap_or(defaults.hash_workers),
        }
    }

    fn image_source(&self, config: &PipelineConfig) -> Result<Box<dyn ImageSource>> {
        if let Some(dir) = &self.from_dir {
            tracing::info!(dir = %dir.display(), "Reading archived logos");
            return Ok(Box::new(DirectoryImageSource::new(dir)));
        }

        let http = HttpImageSource::new(config.request_timeout)
            .context("Failed to create HTTP client")?
            .with_url_template(&self.url_template);

        Ok(match &self.archive_dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "Archiving downloaded logos");
                Box::new(ArchivingImageSource::new(http, dir))
            }
            None => Box::new(http),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,logo_cluster=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.pipeline_config();

    // --- 1. Domain List ---
    tracing::info!(input = %args.input.display(), "Reading domain list");
    let domains = domain_list::from_path(&args.input)
        .list_domains()
        .with_context(|| format!("Failed to read domain list from {}", args.input.display()))?;
    tracing::info!(domains = domains.len(), "Domain list loaded");

    // --- 2. Pipeline Initialization ---
    let pipeline = ParallelPipeline::new(config.clone()).context("Invalid configuration")?;
    let source = args.image_source(&config)?;

    // --- 3. Acquire, Hash, Group ---
    let report = pipeline
        .run(&domains, source.as_ref())
        .await
        .context("Batch failed")?;

    // --- 4. Persist ---
    tracing::info!(
        groups = report.partition.len(),
        output = %args.output.display(),
        "Saving groups"
    );
    JsonFileSink::new(&args.output)
        .persist(&report.partition)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    tracing::info!(
        hashed = report.stats.hashed,
        dropped = report.stats.dropped(),
        groups = report.partition.len(),
        "Done"
    );
    Ok(())
}
