#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use toolpin_pm::ProgressCallback;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SCRIPT: &[u8] = b"#!/bin/sh\necho hello from tool\n";

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A .tar.gz holding a single executable entry
pub fn tarball(name: &str, data: &[u8]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut archive = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_path(name).unwrap();
    header.set_size(data.len() as u64);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    archive.append(&header, data).unwrap();

    archive.into_inner().unwrap().finish().unwrap()
}

/// A zip holding a single executable entry
pub fn zip_archive(name: &str, data: &[u8]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o755);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    writer.finish().unwrap().into_inner()
}

pub async fn serve(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/octet-stream"))
        .mount(server)
        .await;
}

/// Mount `hops` 302 redirects `/hop/0 -> /hop/1 -> ... -> /hop/<hops>`,
/// the last of which serves `body`
pub async fn serve_redirect_chain(server: &MockServer, hops: usize, body: Vec<u8>) {
    for i in 0..hops {
        Mock::given(method("GET"))
            .and(path(format!("/hop/{}", i)))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", format!("/hop/{}", i + 1)))
            .mount(server)
            .await;
    }
    serve(server, &format!("/hop/{}", hops), body).await;
}

/// A progress callback recording every value it receives
pub fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |f: f64| sink.lock().unwrap().push(f));
    (callback, seen)
}

pub fn assert_monotonic_within_bounds(values: &[f64]) {
    assert!(values.iter().all(|f| *f > 0.0 && *f < 1.0), "{:?}", values);
    assert!(values.windows(2).all(|w| w[0] < w[1]), "{:?}", values);
}
