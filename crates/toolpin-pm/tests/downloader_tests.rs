mod common;

use common::{assert_monotonic_within_bounds, recorder, serve, serve_redirect_chain};
use toolpin_pm::downloader::{no_progress, CommandSpec};
use toolpin_pm::{Download, DownloadError, Downloader, DownloaderConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MISSING_PROGRAM: &str = "toolpin-test-no-such-downloader";

fn builtin() -> Downloader {
    Downloader::new(DownloaderConfig::new().builtin_only()).unwrap()
}

async fn drain(download: &mut Download) -> Result<Vec<u8>, DownloadError> {
    let mut body = Vec::new();
    while let Some(chunk) = download.next_chunk().await? {
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[tokio::test]
async fn streams_body_with_bounded_progress() {
    let body: Vec<u8> = (0..512 * 1024).map(|i| (i % 251) as u8).collect();
    let server = MockServer::start().await;
    serve(&server, "/tool.gz", body.clone()).await;

    let (callback, seen) = recorder();
    let mut download = builtin()
        .start(&format!("{}/tool.gz", server.uri()), callback)
        .unwrap();

    assert_eq!(drain(&mut download).await.unwrap(), body);
    assert_eq!(download.backend(), "http");
    assert_monotonic_within_bounds(&seen.lock().unwrap());
}

#[tokio::test]
async fn follows_49_redirects() {
    let server = MockServer::start().await;
    serve_redirect_chain(&server, 49, b"payload".to_vec()).await;

    let mut download = builtin()
        .start(&format!("{}/hop/0", server.uri()), no_progress())
        .unwrap();

    assert_eq!(drain(&mut download).await.unwrap(), b"payload");
}

#[tokio::test]
async fn fails_after_51_redirects() {
    let server = MockServer::start().await;
    serve_redirect_chain(&server, 51, b"payload".to_vec()).await;

    let mut download = builtin()
        .start(&format!("{}/hop/0", server.uri()), no_progress())
        .unwrap();

    match drain(&mut download).await {
        Err(DownloadError::TooManyRedirects { limit }) => assert_eq!(limit, 50),
        other => panic!("Expected TooManyRedirects, got {:?}", other),
    }
}

#[tokio::test]
async fn redirect_budget_is_configurable() {
    let server = MockServer::start().await;
    serve_redirect_chain(&server, 3, b"payload".to_vec()).await;

    let downloader = Downloader::new(DownloaderConfig::new().builtin_only().with_max_redirects(2)).unwrap();
    let mut download = downloader
        .start(&format!("{}/hop/0", server.uri()), no_progress())
        .unwrap();

    let err = drain(&mut download).await.unwrap_err();
    assert_eq!(err.to_string(), "Too many redirects (limit: 2).");
}

#[tokio::test]
async fn redirect_without_location_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(302))
        .mount(&server)
        .await;

    let mut download = builtin()
        .start(&format!("{}/moved", server.uri()), no_progress())
        .unwrap();

    let err = drain(&mut download).await.unwrap_err();
    assert!(matches!(err, DownloadError::MissingLocation { .. }));
    assert_eq!(err.to_string(), "Got 302 without location header.");
}

#[tokio::test]
async fn unexpected_status_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut download = builtin()
        .start(&format!("{}/missing", server.uri()), no_progress())
        .unwrap();

    match drain(&mut download).await {
        Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("Expected HttpStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_programs_fall_back_to_http() {
    let server = MockServer::start().await;
    serve(&server, "/tool.gz", b"payload".to_vec()).await;

    let config = DownloaderConfig::new()
        .with_curl(Some(CommandSpec::new(MISSING_PROGRAM, ["-#fL"])))
        .with_wget(Some(CommandSpec::new(MISSING_PROGRAM, ["-O", "-"])));
    let downloader = Downloader::new(config).unwrap();

    let mut download = downloader
        .start(&format!("{}/tool.gz", server.uri()), no_progress())
        .unwrap();

    assert_eq!(download.backend(), "http");
    assert_eq!(drain(&mut download).await.unwrap(), b"payload");
}

#[cfg(unix)]
#[tokio::test]
async fn missing_curl_falls_back_to_wget() {
    let config = DownloaderConfig::new()
        .with_curl(Some(CommandSpec::new(MISSING_PROGRAM, ["-#fL"])))
        .with_wget(Some(CommandSpec::new("sh", ["-c", "printf 'from %s' \"$1\"", "sh"])));
    let downloader = Downloader::new(config).unwrap();

    let mut download = downloader.start("url", no_progress()).unwrap();

    assert_eq!(download.backend(), "wget");
    assert_eq!(drain(&mut download).await.unwrap(), b"from url");
}

#[cfg(unix)]
#[tokio::test]
async fn unusable_curl_is_reported_without_fallback() {
    let not_a_program = tempfile::TempDir::new().unwrap();
    let config = DownloaderConfig::new()
        .with_curl(Some(CommandSpec::new(not_a_program.path(), ["-#fL"])))
        .with_wget(Some(CommandSpec::new("sh", ["-c", "printf unreachable", "sh"])));
    let downloader = Downloader::new(config).unwrap();

    match downloader.start("https://example.com/tool.gz", no_progress()) {
        Err(DownloadError::Spawn { backend, .. }) => assert_eq!(backend, "curl"),
        Err(other) => panic!("Expected Spawn, got {:?}", other),
        Ok(download) => panic!("Expected Spawn, got a download via {}", download.backend()),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn kill_stops_an_external_download() {
    let config = DownloaderConfig::new().with_curl(Some(CommandSpec::new("sh", ["-c", "sleep 30", "sh"])));
    let downloader = Downloader::new(config).unwrap();

    let mut download = downloader.start("https://example.com/tool.gz", no_progress()).unwrap();
    download.kill();
    download.kill();

    assert!(download.next_chunk().await.unwrap().is_none());
}
