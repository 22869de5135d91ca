//! On-disk response cache
//!
//! One file per URL. The file name is the form-encoded URL and the contents
//! are a three-digit status code, a newline, then the response body:
//!
//! ```text
//! 200
//! v1.0.0
//! v1.1.0
//! ```
//!
//! Non-2xx outcomes are stored with an empty body so that missing resources
//! are not fetched again until the entry expires.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::FetchError;

/// A cached upstream outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedResponse {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path, ttl: Duration) -> Result<Self, FetchError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            ttl,
        })
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(escape_key(url))
    }

    /// Returns the stored outcome for `url` if a fresh entry exists.
    pub async fn get(&self, url: &str) -> Result<Option<CachedResponse>, FetchError> {
        let path = self.path_for(url);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            debug!("Cache entry for {} is stale ({:?} old)", url, age);
            return Ok(None);
        }

        let data = tokio::fs::read(&path).await?;
        match decode_entry(data) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!("Ignoring cache entry for {}: {}", url, e);
                Ok(None)
            }
        }
    }

    /// Stores an outcome for `url`.
    ///
    /// The entry is written to a temporary file in the cache directory and
    /// renamed into place, so readers never see a partial entry.
    pub async fn put(&self, url: &str, status: u16, body: &[u8]) -> Result<(), FetchError> {
        let mut data = format!("{:03}\n", status).into_bytes();
        data.extend_from_slice(body);
        let dir = self.dir.clone();
        let path = self.path_for(url);

        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut file = tempfile::NamedTempFile::new_in(&dir)?;
            file.write_all(&data)?;
            file.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;
        Ok(())
    }
}

/// Escapes a URL into a single file name component.
fn escape_key(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

fn decode_entry(mut data: Vec<u8>) -> Result<CachedResponse, FetchError> {
    if data.len() < 4 {
        return Err(FetchError::CorruptCache("contents too short".to_string()));
    }
    if data[3] != b'\n' {
        return Err(FetchError::CorruptCache(
            "missing newline after status".to_string(),
        ));
    }
    let status = std::str::from_utf8(&data[..3])
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| FetchError::CorruptCache("bad status code".to_string()))?;

    if (200..300).contains(&status) {
        Ok(CachedResponse::Body(data.split_off(4)))
    } else {
        Ok(CachedResponse::Status(status))
    }
}
