//! Async download with streaming SHA256 hashing and retry.
//!
//! The artifact is written to disk and hashed in the same pass. Comparing
//! the digest with the declared checksum is a separate step
//! ([`verify_digest`]) so callers can report it as its own phase.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::Reporter;
use formulary_schema::{PackageName, Sha256Digest, Sha256Hash, Version};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
}

impl DownloadError {
    /// Whether another attempt could succeed.
    ///
    /// Connection problems, timeouts, interrupted bodies, 5xx and 429 are
    /// transient. A checksum mismatch never is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                if let Some(status) = e.status() {
                    return status.is_server_error()
                        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                }
                e.is_connect() || e.is_timeout() || e.is_body() || e.is_request()
            }
            Self::Io(_) | Self::HashMismatch { .. } => false,
        }
    }
}

/// Request for a download operation
pub struct DownloadRequest<'a, R: Reporter> {
    pub client: &'a Client,
    pub pkg_name: &'a PackageName,
    pub version: &'a Version,
    pub url: &'a str,
    pub dest: &'a Path,
    pub reporter: &'a R,
    pub retries: u32,
    pub backoff: Duration,
}

impl<'a, R: Reporter> DownloadRequest<'a, R> {
    pub fn new(
        client: &'a Client,
        pkg_name: &'a PackageName,
        version: &'a Version,
        url: &'a str,
        dest: &'a Path,
        reporter: &'a R,
    ) -> Self {
        Self {
            client,
            pkg_name,
            version,
            url,
            dest,
            reporter,
            retries: 0,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Download to `dest`, returning the SHA256 of the bytes written.
    ///
    /// Transient failures are retried `retries` times with linear back-off;
    /// a partial file from a failed attempt is removed before the next one.
    pub async fn execute(self) -> Result<Sha256Digest, DownloadError> {
        let mut attempt = 0;
        loop {
            match self.attempt().await {
                Ok(digest) => return Ok(digest),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(url = self.url, attempt, error = %e, "download failed, retrying");
                    tokio::fs::remove_file(self.dest).await.ok();
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    tokio::fs::remove_file(self.dest).await.ok();
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self) -> Result<Sha256Digest, DownloadError> {
        let (name, version, reporter) = (self.pkg_name, self.version, self.reporter);
        download_to_file(self.client, self.url, self.dest, |current, total| {
            reporter.downloading(name, version, current, total);
        })
        .await
    }
}

/// Stream `url` into `dest`, hashing as it goes.
///
/// `progress` is called with the running byte count and the advertised
/// length, if any.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    mut progress: impl FnMut(u64, Option<u64>),
) -> Result<Sha256Digest, DownloadError> {
    debug!(url, dest = %dest.display(), "downloading");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length();
    progress(0, total_size);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        progress(downloaded, total_size);
    }

    file.flush().await?;
    Ok(Sha256Digest::from_bytes(hasher.finalize().into()))
}

/// Compare a computed digest with the declared checksum.
pub fn verify_digest(expected: &Sha256Hash, actual: &Sha256Digest) -> Result<(), DownloadError> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(DownloadError::HashMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// SHA256 of a file on disk.
pub fn hash_file(path: &Path) -> std::io::Result<Sha256Digest> {
    use std::io::Read;

    let mut hasher = Sha256::new();
    let mut file = std::fs::File::open(path)?;
    let mut buffer = [0u8; 8192];
    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(Sha256Digest::from_bytes(hasher.finalize().into()))
}
