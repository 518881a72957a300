//! Remote dictionary with a local ETag/TTL cache.
//!
//! Resolution order for [`RemoteDictionarySource::fetch`]:
//!
//! 1. local cache younger than the TTL (skipped on `force_refresh`)
//! 2. HTTP GET with `If-None-Match`; `200` replaces the cache, `304` touches it
//! 3. any readable local cache, even a stale one
//! 4. the bundled fallback file
//!
//! When all four fail the fetch returns [`StandardsError::Unavailable`].

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_NONE_MATCH, USER_AGENT};
use tracing::{debug, info, warn};
use tuss_model::DictionaryBlob;

use crate::dictionary::parse_blob;
use crate::error::{Result, StandardsError};
use crate::hash::sha256_hex;
use crate::source::DictionarySource;

/// Published community dictionary.
pub const DEFAULT_REMOTE_URL: &str =
    "https://raw.githubusercontent.com/svgreve/sutram-tuss-dictionary/main/tuss_exames_comuns.json";

/// Cached copy is considered fresh for 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_USER_AGENT: &str = "tuss-dict-fetcher/1.0";

const CACHE_FILENAME: &str = "tuss_dict_cache.json";
const ETAG_FILENAME: &str = "tuss_dict_etag.txt";

/// Settings for [`RemoteDictionarySource`].
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub url: String,
    pub cache_dir: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub ttl: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REMOTE_URL.to_string(),
            cache_dir: default_cache_dir(),
            fallback_path: None,
            ttl: DEFAULT_TTL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RemoteConfig {
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_fallback_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILENAME)
    }

    fn etag_file(&self) -> PathBuf {
        self.cache_dir.join(ETAG_FILENAME)
    }
}

/// `~/.cache/tuss-dict`, or `.cache/tuss-dict` when `HOME` is unset.
pub fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".cache")
        .join("tuss-dict")
}

/// Which tier served the last fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryOrigin {
    Cache,
    Remote,
    Fallback,
}

impl fmt::Display for DictionaryOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cache => "cache",
            Self::Remote => "remote",
            Self::Fallback => "fallback",
        })
    }
}

/// Snapshot of the last successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub origin: DictionaryOrigin,
    /// `_meta.version` of the served blob, or "unknown".
    pub version: String,
    /// Age of the local cache file, if one exists.
    pub cache_age: Option<Duration>,
    pub total_exams: usize,
    pub remote_url: String,
}

impl SourceStatus {
    pub fn cache_age_hours(&self) -> f64 {
        self.cache_age
            .map_or(0.0, |age| (age.as_secs_f64() / 36.0).round() / 100.0)
    }
}

struct Loaded {
    origin: DictionaryOrigin,
    version: String,
    total_exams: usize,
}

enum RemoteFetch {
    Fresh(DictionaryBlob),
    NotModified,
    Failed,
}

/// Dictionary fetched over HTTP and cached on disk.
pub struct RemoteDictionarySource {
    config: RemoteConfig,
    client: Client,
    loaded: Mutex<Option<Loaded>>,
}

impl RemoteDictionarySource {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(StandardsError::HttpClient)?;
        Ok(Self {
            config,
            client,
            loaded: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Fetch the dictionary, honouring the cache TTL unless `force_refresh`.
    pub fn fetch(&self, force_refresh: bool) -> Result<DictionaryBlob> {
        debug!(force_refresh, url = %self.config.url, "fetching dictionary");

        if !force_refresh
            && self.cache_is_fresh()
            && let Some(blob) = self.read_cache()
        {
            return Ok(self.remember(blob, DictionaryOrigin::Cache));
        }

        match self.fetch_remote() {
            RemoteFetch::Fresh(blob) => return Ok(self.remember(blob, DictionaryOrigin::Remote)),
            RemoteFetch::NotModified | RemoteFetch::Failed => {}
        }

        if let Some(blob) = self.read_cache() {
            return Ok(self.remember(blob, DictionaryOrigin::Cache));
        }

        if let Some(blob) = self.read_fallback() {
            return Ok(self.remember(blob, DictionaryOrigin::Fallback));
        }

        Err(StandardsError::Unavailable {
            url: self.config.url.clone(),
        })
    }

    /// Status of the last successful fetch, `None` before the first one.
    pub fn status(&self) -> Option<SourceStatus> {
        let loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        loaded.as_ref().map(|loaded| SourceStatus {
            origin: loaded.origin,
            version: loaded.version.clone(),
            cache_age: file_age(&self.config.cache_file()),
            total_exams: loaded.total_exams,
            remote_url: self.config.url.clone(),
        })
    }

    /// Delete the cached dictionary and ETag.
    pub fn invalidate_cache(&self) -> Result<()> {
        for path in [self.config.cache_file(), self.config.etag_file()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed cached file"),
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => return Err(StandardsError::io(path, error)),
            }
        }
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = None;
        info!(dir = %self.config.cache_dir.display(), "dictionary cache invalidated");
        Ok(())
    }

    fn remember(&self, blob: DictionaryBlob, origin: DictionaryOrigin) -> DictionaryBlob {
        let version = blob.meta_version().unwrap_or("unknown").to_string();
        info!(%origin, %version, exams = blob.exams.len(), "dictionary fetched");
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = Some(Loaded {
            origin,
            version,
            total_exams: blob.exams.len(),
        });
        blob
    }

    fn cache_is_fresh(&self) -> bool {
        match file_age(&self.config.cache_file()) {
            Some(age) if age <= self.config.ttl => {
                debug!(age_secs = age.as_secs(), "dictionary cache is fresh");
                true
            }
            Some(age) => {
                debug!(age_secs = age.as_secs(), "dictionary cache is stale");
                false
            }
            None => false,
        }
    }

    fn read_cache(&self) -> Option<DictionaryBlob> {
        read_blob(&self.config.cache_file())
    }

    fn read_fallback(&self) -> Option<DictionaryBlob> {
        let path = self.config.fallback_path.as_deref()?;
        debug!(path = %path.display(), "loading fallback dictionary");
        read_blob(path)
    }

    fn read_etag(&self) -> Option<String> {
        let etag = fs::read_to_string(self.config.etag_file()).ok()?;
        let etag = etag.trim();
        (!etag.is_empty()).then(|| etag.to_string())
    }

    fn fetch_remote(&self) -> RemoteFetch {
        let mut request = self
            .client
            .get(&self.config.url)
            .header(USER_AGENT, &self.config.user_agent);
        if let Some(etag) = self.read_etag() {
            debug!(%etag, "sending If-None-Match");
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %self.config.url, %error, "dictionary fetch failed");
                return RemoteFetch::Failed;
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!("remote dictionary not modified");
            self.touch_cache();
            return RemoteFetch::NotModified;
        }
        if !status.is_success() {
            warn!(url = %self.config.url, status = status.as_u16(), "dictionary fetch rejected");
            return RemoteFetch::Failed;
        }

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = match response.bytes() {
            Ok(body) => body,
            Err(error) => {
                warn!(url = %self.config.url, %error, "failed to read dictionary response");
                return RemoteFetch::Failed;
            }
        };
        let blob = match parse_blob(&body, &self.config.url) {
            Ok(blob) => blob,
            Err(error) => {
                warn!(%error, "remote dictionary is invalid");
                return RemoteFetch::Failed;
            }
        };

        info!(bytes = body.len(), sha256 = %sha256_hex(&body), "remote dictionary downloaded");
        self.write_cache(&body, etag.as_deref());
        RemoteFetch::Fresh(blob)
    }

    fn write_cache(&self, body: &[u8], etag: Option<&str>) {
        if let Err(error) = fs::create_dir_all(&self.config.cache_dir) {
            warn!(dir = %self.config.cache_dir.display(), %error, "cannot create dictionary cache dir");
            return;
        }
        if let Err(error) = fs::write(self.config.cache_file(), body) {
            warn!(%error, "failed to write dictionary cache");
        }
        if let Some(etag) = etag
            && let Err(error) = fs::write(self.config.etag_file(), etag)
        {
            warn!(%error, "failed to store ETag");
        }
    }

    fn touch_cache(&self) {
        let touched = fs::File::options()
            .write(true)
            .open(self.config.cache_file())
            .and_then(|file| file.set_modified(SystemTime::now()));
        if let Err(error) = touched {
            debug!(%error, "could not refresh dictionary cache timestamp");
        }
    }
}

impl DictionarySource for RemoteDictionarySource {
    fn load(&self) -> Result<DictionaryBlob> {
        self.fetch(false)
    }

    fn describe(&self) -> String {
        format!("remote:{}", self.config.url)
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default(),
    )
}

fn read_blob(path: &Path) -> Option<DictionaryBlob> {
    let bytes = fs::read(path).ok()?;
    match parse_blob(&bytes, &path.display().to_string()) {
        Ok(blob) => Some(blob),
        Err(error) => {
            warn!(%error, "ignoring unreadable dictionary copy");
            None
        }
    }
}
