//! Built-in HTTP(S) download backend.
//!
//! Used when neither external downloader is installed. Redirects are
//! followed by hand (302 only) so the hop budget and a missing `Location`
//! header are reported precisely.

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use url::Url;

use super::progress::{ProgressCallback, ProgressFilter};
use super::DownloadError;

pub(crate) const BACKEND: &str = "http";

enum State {
    Pending(String),
    Streaming(BoxStream<'static, reqwest::Result<Vec<u8>>>),
    Done,
}

pub(crate) struct HttpDownload {
    client: Client,
    state: State,
    max_redirects: u32,
    filter: ProgressFilter,
    received: u64,
    total: Option<u64>,
}

impl HttpDownload {
    /// Prepare a download; nothing is sent until the first chunk is requested
    pub(crate) fn new(client: Client, url: &str, max_redirects: u32, on_progress: ProgressCallback) -> Self {
        Self {
            client,
            state: State::Pending(url.to_string()),
            max_redirects,
            filter: ProgressFilter::new(on_progress),
            received: 0,
            total: None,
        }
    }

    pub(crate) async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
        loop {
            match &mut self.state {
                State::Pending(url) => {
                    let url = std::mem::take(url);
                    match self.open(&url).await {
                        Ok(stream) => self.state = State::Streaming(stream),
                        Err(e) => {
                            self.state = State::Done;
                            return Err(e);
                        }
                    }
                }
                State::Streaming(stream) => match stream.next().await {
                    Some(Ok(chunk)) => {
                        self.received += chunk.len() as u64;
                        if let Some(total) = self.total {
                            self.filter.report(self.received as f64 / total as f64);
                        }
                        return Ok(Some(chunk));
                    }
                    Some(Err(e)) => {
                        self.state = State::Done;
                        return Err(DownloadError::Transport(e));
                    }
                    None => {
                        log::debug!("HTTP download finished ({} bytes)", self.received);
                        self.state = State::Done;
                        return Ok(None);
                    }
                },
                State::Done => return Ok(None),
            }
        }
    }

    /// Send the request, following 302 redirects until a 200 arrives
    async fn open(&mut self, url: &str) -> Result<BoxStream<'static, reqwest::Result<Vec<u8>>>, DownloadError> {
        let mut url = Url::parse(url).map_err(|source| DownloadError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let mut redirects_left = self.max_redirects;

        loop {
            log::debug!("HTTP GET {}", url);
            let response = self.client.get(url.clone()).send().await?;

            match response.status() {
                StatusCode::OK => {
                    self.total = response.content_length().filter(|&length| length > 0);
                    return Ok(response
                        .bytes_stream()
                        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                        .boxed());
                }
                StatusCode::FOUND => {
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .ok_or_else(|| DownloadError::MissingLocation { url: url.to_string() })?;

                    if redirects_left == 0 {
                        return Err(DownloadError::TooManyRedirects {
                            limit: self.max_redirects,
                        });
                    }
                    redirects_left -= 1;

                    let next = url.join(location).map_err(|source| DownloadError::InvalidUrl {
                        url: location.to_string(),
                        source,
                    })?;
                    log::debug!("HTTP 302 {} -> {}", url, next);
                    url = next;
                }
                status => {
                    return Err(DownloadError::HttpStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    /// Abort the transfer; dropping the stream closes the connection
    pub(crate) fn kill(&mut self) {
        self.state = State::Done;
    }
}
