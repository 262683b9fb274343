use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use crate::catalog::CatalogEntry;
use crate::domain::{DEFAULT_DATASETS_DIR, ExplorerError, FetchError};
use crate::normalizer::RawRecord;

/// Read access to the pre-generated catalog and dataset documents.
///
/// Implementations must be shareable with the worker threads loads run on.
/// Neither call retries, failures are reported as they happen.
pub trait DatasetFetcher: Send + Sync {
    fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogEntry>, FetchError>;
    fn fetch_dataset(&self, source_ref: &str) -> Result<Vec<RawRecord>, FetchError>;
}

fn parse_document<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

// Dataset payloads live directly below the datasets directory.
fn checked_ref(source_ref: &str) -> Result<&str, FetchError> {
    let path = Path::new(source_ref);
    let plain = !source_ref.is_empty()
        && path.components().count() == 1
        && matches!(path.components().next(), Some(Component::Normal(_)));
    if plain {
        Ok(source_ref)
    } else {
        debug!("Rejecting dataset reference {source_ref:?}");
        Err(FetchError::HttpStatus(404))
    }
}

/// Serves documents from a local directory laid out as
/// `<root>/<catalog>` and `<root>/<datasets_dir>/<source_ref>`.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
    datasets_dir: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            datasets_dir: PathBuf::from(DEFAULT_DATASETS_DIR),
        }
    }

    pub fn with_datasets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.datasets_dir = dir.into();
        self
    }

    fn read(path: &Path) -> Result<Vec<u8>, FetchError> {
        trace!("Reading {}", path.display());
        fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::HttpStatus(404),
            ErrorKind::PermissionDenied => FetchError::HttpStatus(403),
            ErrorKind::TimedOut => FetchError::Timeout,
            _ => FetchError::Io(e.to_string()),
        })
    }
}

impl DatasetFetcher for DirectoryFetcher {
    #[instrument(level = "debug", skip(self))]
    fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogEntry>, FetchError> {
        let body = Self::read(&self.root.join(locator))?;
        parse_document(&body)
    }

    #[instrument(level = "debug", skip(self))]
    fn fetch_dataset(&self, source_ref: &str) -> Result<Vec<RawRecord>, FetchError> {
        let name = checked_ref(source_ref)?;
        let body = Self::read(&self.root.join(&self.datasets_dir).join(name))?;
        parse_document(&body)
    }
}

/// Serves documents from a static web server with the same layout as
/// [`DirectoryFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    datasets_dir: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
            datasets_dir: DEFAULT_DATASETS_DIR.to_string(),
        })
    }

    pub fn with_datasets_dir(mut self, dir: impl Into<String>) -> Self {
        self.datasets_dir = dir.into();
        self
    }

    fn url_for(&self, key: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, key)
        } else {
            format!("{}/{}", self.base_url, key)
        }
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(key);
        debug!("GET {url}");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

impl DatasetFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    fn fetch_catalog(&self, locator: &str) -> Result<Vec<CatalogEntry>, FetchError> {
        parse_document(&self.get(locator)?)
    }

    #[instrument(level = "debug", skip(self))]
    fn fetch_dataset(&self, source_ref: &str) -> Result<Vec<RawRecord>, FetchError> {
        let name = checked_ref(source_ref)?;
        let dir = self.datasets_dir.trim_end_matches('/');
        parse_document(&self.get(&format!("{dir}/{name}"))?)
    }
}

/// Where catalog and dataset documents come from, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Directory(PathBuf),
    Http(String),
}

impl ContentSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            ContentSource::Http(source.to_string())
        } else {
            ContentSource::Directory(PathBuf::from(source))
        }
    }

    pub fn build(
        &self,
        datasets_dir: &str,
        timeout: Option<Duration>,
    ) -> Result<Arc<dyn DatasetFetcher>, ExplorerError> {
        let fetcher: Arc<dyn DatasetFetcher> = match self {
            ContentSource::Directory(root) => {
                Arc::new(DirectoryFetcher::new(root).with_datasets_dir(datasets_dir))
            }
            ContentSource::Http(url) => {
                Arc::new(HttpFetcher::new(url.clone(), timeout)?.with_datasets_dir(datasets_dir))
            }
        };
        Ok(fetcher)
    }
}
