//! Fetching asset bytes.
//!
//! A [`Downloader`] tries, in order, `curl`, `wget` and a built-in HTTP
//! client. A later backend is only used when the previous program is not
//! installed (spawn fails with `NotFound`); any other failure is final.
//!
//! # Examples
//!
//! ```no_run
//! use toolpin_pm::downloader::{no_progress, Downloader, DownloaderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = Downloader::new(DownloaderConfig::new())?;
//! let mut download = downloader.start("https://example.com/tool.gz", no_progress())?;
//!
//! while let Some(chunk) = download.next_chunk().await? {
//!     println!("{} bytes from {}", chunk.len(), download.backend());
//! }
//! # Ok(())
//! # }
//! ```

mod http;
mod process;
mod progress;

pub use process::CommandSpec;
pub use progress::{no_progress, strip_progress_bar, ProgressCallback, ProgressFilter, ProgressParser};

use std::io::ErrorKind;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::error::ExitReason;
use http::HttpDownload;
use process::ProcessDownload;

const DEFAULT_USER_AGENT: &str = concat!("toolpin/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Same default as curl
const DEFAULT_MAX_REDIRECTS: u32 = 50;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to start {backend}: {source}")]
    Spawn {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} exited with {reason}:\n{stderr}")]
    ProcessExit {
        backend: &'static str,
        reason: ExitReason,
        stderr: String,
    },

    #[error("Failed to read from {backend}: {source}")]
    Io {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unexpected status code: {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Got 302 without location header.")]
    MissingLocation { url: String },

    #[error("Too many redirects (limit: {limit}).")]
    TooManyRedirects { limit: u32 },
}

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// First choice; `None` skips it
    pub curl: Option<CommandSpec>,
    /// Second choice; `None` skips it
    pub wget: Option<CommandSpec>,
    pub max_redirects: u32,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            curl: Some(CommandSpec::curl()),
            wget: Some(CommandSpec::wget()),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DownloaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curl(mut self, curl: Option<CommandSpec>) -> Self {
        self.curl = curl;
        self
    }

    pub fn with_wget(mut self, wget: Option<CommandSpec>) -> Self {
        self.wget = wget;
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Use only the built-in HTTP client
    pub fn builtin_only(self) -> Self {
        self.with_curl(None).with_wget(None)
    }
}

pub struct Downloader {
    config: DownloaderConfig,
    client: Client,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Start downloading `url` with the first available backend.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self, url: &str, on_progress: ProgressCallback) -> Result<Download, DownloadError> {
        let external = [("curl", &self.config.curl), ("wget", &self.config.wget)];

        for (backend, command) in external {
            let Some(command) = command else {
                continue;
            };

            match ProcessDownload::spawn(backend, command, url, on_progress.clone()) {
                Ok(process) => {
                    log::debug!("Downloading {} with {}", url, backend);
                    return Ok(Download {
                        inner: Backend::Process(process),
                    });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::debug!("{} is not installed, trying the next downloader", backend);
                }
                Err(source) => return Err(DownloadError::Spawn { backend, source }),
            }
        }

        log::debug!("Downloading {} with the built-in HTTP client", url);
        Ok(Download {
            inner: Backend::Http(HttpDownload::new(
                self.client.clone(),
                url,
                self.config.max_redirects,
                on_progress,
            )),
        })
    }
}

enum Backend {
    Process(ProcessDownload),
    Http(HttpDownload),
}

/// An in-flight download.
///
/// Chunks arrive in order; `Ok(None)` means the backend finished
/// successfully. [`Download::kill`] may be called at any time, repeatedly.
pub struct Download {
    inner: Backend,
}

impl Download {
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
        match &mut self.inner {
            Backend::Process(process) => process.next_chunk().await,
            Backend::Http(http) => http.next_chunk().await,
        }
    }

    pub fn kill(&mut self) {
        match &mut self.inner {
            Backend::Process(process) => process.kill(),
            Backend::Http(http) => http.kill(),
        }
    }

    /// Name of the backend doing the work: `curl`, `wget` or `http`
    pub fn backend(&self) -> &'static str {
        match &self.inner {
            Backend::Process(process) => process.backend(),
            Backend::Http(_) => http::BACKEND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloaderConfig::default();
        assert_eq!(config.curl, Some(CommandSpec::curl()));
        assert_eq!(config.wget, Some(CommandSpec::wget()));
        assert_eq!(config.max_redirects, 50);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.user_agent.starts_with("toolpin/"));
    }

    #[test]
    fn test_config_builder() {
        let config = DownloaderConfig::new()
            .with_max_redirects(5)
            .with_connect_timeout(Duration::from_secs(5))
            .with_user_agent("Test/1.0".to_string())
            .builtin_only();

        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "Test/1.0");
        assert!(config.curl.is_none());
        assert!(config.wget.is_none());
    }

    #[test]
    fn test_error_display() {
        let err = DownloadError::HttpStatus {
            status: 404,
            url: "https://example.com/missing".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected status code: 404");

        let err = DownloadError::MissingLocation {
            url: "https://example.com".to_string(),
        };
        assert_eq!(err.to_string(), "Got 302 without location header.");

        let err = DownloadError::ProcessExit {
            backend: "curl",
            reason: ExitReason::Code(22),
            stderr: "curl: (22) error".to_string(),
        };
        assert_eq!(err.to_string(), "curl exited with exit code 22:\ncurl: (22) error");
    }

    #[tokio::test]
    async fn test_builtin_only_uses_http() {
        let downloader = Downloader::new(DownloaderConfig::new().builtin_only()).unwrap();
        let download = downloader.start("http://127.0.0.1:1/tool.gz", no_progress()).unwrap();
        assert_eq!(download.backend(), "http");
    }
}
