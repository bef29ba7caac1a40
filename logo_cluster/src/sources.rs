// THEORY:
// Image sources are where logos come from. `HttpImageSource` downloads them
// from a URL template, `DirectoryImageSource` reads a previously archived
// directory from disk, and `ArchivingImageSource` wraps another source and keeps
// a PNG copy of every logo it hands out.
//
// A source never fails the batch. Anything that goes wrong for one domain is
// reported as a `Failure` for that domain alone.

use crate::core_modules::domain::Domain;
use crate::core_modules::pixel_grid::pixel_grid::PixelGrid;
use crate::core_modules::utils::image_helper::image_helper;
use crate::error::Result;
use crate::pipeline::Failure;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Logo provider used when no template is configured.
pub const DEFAULT_LOGO_URL_TEMPLATE: &str = "https://logo.clearbit.com/{domain}";

const DOMAIN_PLACEHOLDER: &str = "{domain}";

/// Resolves a domain to a decoded logo.
///
/// Implementations must be idempotent and free of side effects visible to the
/// caller; caching and retries are their own business.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, domain: &Domain) -> std::result::Result<PixelGrid, Failure>;
}

/// Downloads logos over HTTP.
pub struct HttpImageSource {
    client: reqwest::Client,
    url_template: String,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("logo_cluster/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            url_template: DEFAULT_LOGO_URL_TEMPLATE.to_string(),
        })
    }

    /// Uses `template` to build logo URLs; `{domain}` is replaced by the domain.
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn logo_url(&self, domain: &Domain) -> String {
        self.url_template.replace(DOMAIN_PLACEHOLDER, domain.as_str())
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, domain: &Domain) -> std::result::Result<PixelGrid, Failure> {
        let url = self.logo_url(domain);
        debug!(domain = %domain, url = %url, "Fetching logo");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Failure::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Unavailable(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Failure::Unavailable(e.to_string()))?;

        PixelGrid::decode(&bytes).map_err(|e| Failure::Unreadable(e.to_string()))
    }
}

/// Reads `<dir>/<domain>.png`, as written by [`ArchivingImageSource`].
pub struct DirectoryImageSource {
    dir: PathBuf,
}

impl DirectoryImageSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageSource for DirectoryImageSource {
    async fn fetch(&self, domain: &Domain) -> std::result::Result<PixelGrid, Failure> {
        let path = image_helper::logo_path(&self.dir, domain);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Failure::Unavailable(format!("{}: {e}", path.display())))?;
        PixelGrid::decode(&bytes).map_err(|e| Failure::Unreadable(e.to_string()))
    }
}

/// Keeps a PNG copy of every logo the inner source returns. A failed save is
/// logged; the logo is still handed out.
pub struct ArchivingImageSource<S> {
    inner: S,
    dir: PathBuf,
}

impl<S> ArchivingImageSource<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }
}

#[async_trait]
impl<S: ImageSource> ImageSource for ArchivingImageSource<S> {
    async fn fetch(&self, domain: &Domain) -> std::result::Result<PixelGrid, Failure> {
        let grid = self.inner.fetch(domain).await?;
        match image_helper::archive(&self.dir, domain, &grid) {
            Ok(path) => debug!(domain = %domain, path = %path.display(), "Archived logo"),
            Err(e) => warn!(domain = %domain, error = %e, "Couldn't archive logo"),
        }
        Ok(grid)
    }
}
