//! Release archive download and checksum.

use crate::error::{Result, TapReleaseError};
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::{debug, info};

/// Downloads a release artifact and computes its content digest.
pub trait ArtifactHasher {
    /// Lowercase hex SHA-256 of the resource at `url`.
    ///
    /// Fails on transport errors and on any non-success HTTP status.
    fn fetch_and_digest(&self, url: &str) -> Result<String>;
}

/// [ArtifactHasher] backed by a blocking HTTP client.
pub struct HttpArtifactHasher {
    client: reqwest::blocking::Client,
}

impl HttpArtifactHasher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TapReleaseError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpArtifactHasher { client })
    }
}

impl ArtifactHasher for HttpArtifactHasher {
    fn fetch_and_digest(&self, url: &str) -> Result<String> {
        debug!(url, "downloading release archive");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TapReleaseError::checksum(url, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TapReleaseError::checksum(url, format!("HTTP {}", status)));
        }

        let digest = digest_reader(response)
            .map_err(|e| TapReleaseError::checksum(url, format!("failed to read body: {}", e)))?;
        info!(url, sha256 = %digest, "computed archive checksum");
        Ok(digest)
    }
}

/// SHA-256 of everything `reader` yields, as lowercase hex.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
