//! Artifact fetcher: downloads the dump URL into scratch storage and
//! fingerprints its raw bytes.

use crate::error::FetchError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::debug;
use url::Url;

/// A byte-identical local copy of the remote dump plus its content
/// fingerprint (SHA-256 over raw bytes, lowercase hex).
#[derive(Debug)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    pub fingerprint: String,
    pub size: u64,
}

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Builds the download client. Both connect and total time are bounded
    /// so a hung remote fails the run instead of stalling it.
    pub fn new(total_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("dumpsync/0.3")
            .connect_timeout(Duration::from_secs(5))
            .timeout(total_timeout)
            .build()
            .expect("FATAL: initialize dump fetch HTTP client failed");

        Self { client }
    }

    /// Downloads `url` into `scratch`, hashing while streaming to disk.
    ///
    /// The caller owns the scratch directory and its cleanup; this only
    /// writes a single file into it.
    pub async fn fetch(&self, url: &Url, scratch: &Path) -> Result<FetchedArtifact, FetchError> {
        debug!(url = %url, "fetching SQL dump");

        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let path = scratch.join(artifact_file_name(url));
        let mut file = File::create(&path).await?;
        let mut hasher = Sha256::new();
        let mut size: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            hasher.update(&chunk);
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        if size == 0 {
            return Err(FetchError::EmptyBody);
        }

        let fingerprint = format!("{:x}", hasher.finalize());
        debug!(size, fingerprint = %fingerprint, "dump downloaded");

        Ok(FetchedArtifact {
            path,
            fingerprint,
            size,
        })
    }
}

/// Last path segment of the URL, or a fixed name when the URL has none.
fn artifact_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map_or_else(|| "dump.tar".to_string(), ToString::to_string)
}
