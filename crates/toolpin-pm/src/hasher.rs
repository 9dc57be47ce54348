//! Streaming SHA-256 digest of downloaded bytes.

use sha2::{Digest, Sha256};

/// Incremental SHA-256 over a byte stream.
///
/// After [`Hasher::destroy`] or [`Hasher::digest`] the hasher is spent:
/// further updates are ignored and destroying again is a no-op.
#[derive(Debug)]
pub struct Hasher {
    inner: Option<Sha256>,
    bytes: u64,
}

impl Hasher {
    pub fn new() -> Self {
        Self {
            inner: Some(Sha256::new()),
            bytes: 0,
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        if let Some(inner) = self.inner.as_mut() {
            inner.update(chunk);
            self.bytes += chunk.len() as u64;
        }
    }

    /// Number of bytes hashed so far
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the lowercase hex digest.
    ///
    /// Returns `None` if the hasher was already finished or destroyed.
    pub fn digest(&mut self) -> Option<String> {
        self.inner
            .take()
            .map(|inner| format!("{:x}", inner.finalize()))
    }

    pub fn destroy(&mut self) {
        self.inner = None;
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two hex digests ignoring case
pub fn digests_match(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}
