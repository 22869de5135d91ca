//! Module proxy API
//!
//! Typed access to the per-module endpoints:
//! `@v/list`, `@latest`, `@v/<version>.info`, `@v/<version>.mod` and `@v/<version>.zip`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::cancel::CancelToken;
use crate::error::FetchError;
use crate::proxy::client::FetchClient;
use crate::proxy::types::InfoEntry;
use crate::version::latest::ManifestSource;

#[derive(Clone)]
pub struct ProxyClient {
    fetch: Arc<FetchClient>,
    base_url: String,
}

impl ProxyClient {
    pub fn new(fetch: Arc<FetchClient>, base_url: &str) -> Self {
        Self {
            fetch,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Tagged versions of a module, in the order the proxy lists them.
    pub async fn list(&self, path: &str, cancel: &CancelToken) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/@v/list", self.path_url(path)?);
        let body = self.fetch.fetch_cached(&url, cancel).await?;
        let text = String::from_utf8_lossy(&body);

        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    /// The version the proxy itself considers latest.
    pub async fn latest(&self, path: &str, cancel: &CancelToken) -> Result<InfoEntry, FetchError> {
        let url = format!("{}/@latest", self.path_url(path)?);
        self.fetch_info(&url, cancel).await
    }

    pub async fn info(
        &self,
        path: &str,
        version: &str,
        cancel: &CancelToken,
    ) -> Result<InfoEntry, FetchError> {
        let url = self.version_url(path, version, ".info")?;
        self.fetch_info(&url, cancel).await
    }

    /// Raw module descriptor (go.mod) at a version.
    pub async fn mod_file(
        &self,
        path: &str,
        version: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.version_url(path, version, ".mod")?;
        self.fetch.fetch_cached(&url, cancel).await
    }

    /// Module archive at a version. Archives are large and never cached.
    pub async fn zip_data(
        &self,
        path: &str,
        version: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.version_url(path, version, ".zip")?;
        self.fetch.fetch(&url, cancel).await
    }

    /// Descriptor source for one module, for use by the version resolver.
    pub fn manifests<'a>(&'a self, path: &'a str, cancel: &'a CancelToken) -> ModuleManifests<'a> {
        ModuleManifests {
            proxy: self,
            path,
            cancel,
        }
    }

    async fn fetch_info(&self, url: &str, cancel: &CancelToken) -> Result<InfoEntry, FetchError> {
        let body = self.fetch.fetch_cached(url, cancel).await?;
        serde_json::from_slice(&body)
            .map_err(|e| FetchError::InvalidResponse(format!("decoding {}: {}", url, e)))
    }

    fn path_url(&self, path: &str) -> Result<String, FetchError> {
        Ok(format!("{}/{}", self.base_url, escape_path(path)?))
    }

    fn version_url(&self, path: &str, version: &str, suffix: &str) -> Result<String, FetchError> {
        Ok(format!(
            "{}/@v/{}{}",
            self.path_url(path)?,
            escape_version(version)?,
            suffix
        ))
    }
}

/// [`ManifestSource`] backed by the proxy's `.mod` endpoint for one module.
pub struct ModuleManifests<'a> {
    proxy: &'a ProxyClient,
    path: &'a str,
    cancel: &'a CancelToken,
}

#[async_trait]
impl ManifestSource for ModuleManifests<'_> {
    async fn manifest(&self, version: &str) -> Result<Vec<u8>, FetchError> {
        self.proxy.mod_file(self.path, version, self.cancel).await
    }
}

/// Escapes a module path for use in proxy URLs.
/// Uppercase letters are escaped as !{lowercase}, e.g. github.com/Azure -> github.com/!azure.
pub fn escape_path(path: &str) -> Result<String, FetchError> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(FetchError::InvalidPath(format!("malformed module path {:?}", path)));
    }
    escape_string(path)
        .ok_or_else(|| FetchError::InvalidPath(format!("invalid character in module path {:?}", path)))
}

/// Escapes a version for use in proxy URLs, with the same case-encoding as paths.
pub fn escape_version(version: &str) -> Result<String, FetchError> {
    if version.is_empty() || version.contains('/') {
        return Err(FetchError::InvalidPath(format!("malformed version {:?}", version)));
    }
    escape_string(version)
        .ok_or_else(|| FetchError::InvalidPath(format!("invalid character in version {:?}", version)))
}

fn escape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '!' || c.is_whitespace() || c.is_control() {
            return None;
        }
        if c.is_ascii_uppercase() {
            result.push('!');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    Some(result)
}
