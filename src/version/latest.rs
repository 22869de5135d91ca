//! Latest version selection
//!
//! Follows the go command's notion of "latest": tagged releases beat tagged
//! prereleases, which beat pseudo-versions, and semver decides within a tier.
//! An incompatible version only wins if the latest compatible tagged version
//! does not look like it has a real go.mod file.

#[cfg(test)]
use mockall::automock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::version::go::{is_incompatible, is_pseudo_version};
use crate::version::semver::{compare, is_prerelease};

/// Source of module descriptors (go.mod files) by version for a single module
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetches the raw descriptor at `version`.
    async fn manifest(&self, version: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reports whether `v1` is later than `v2`.
pub fn later(v1: &str, v2: &str) -> bool {
    let release1 = !is_prerelease(v1);
    let release2 = !is_prerelease(v2);
    if release1 && release2 {
        return compare(v1, v2).is_gt();
    }
    if release1 != release2 {
        return release1;
    }

    // Both are prereleases; tagged ones beat pseudo-versions.
    let pseudo1 = is_pseudo_version(v1);
    let pseudo2 = is_pseudo_version(v2);
    if pseudo1 == pseudo2 {
        return compare(v1, v2).is_gt();
    }
    !pseudo1
}

/// Returns the latest of `versions`, or `None` if there are none.
pub fn latest_of<S: AsRef<str>>(versions: &[S]) -> Option<String> {
    let mut iter = versions.iter().map(AsRef::as_ref);
    let first = iter.next()?;
    let latest = iter.fold(first, |latest, v| if later(v, latest) { v } else { latest });
    Some(latest.to_string())
}

/// Reports whether a descriptor declares more than the bare module line.
///
/// The proxy always serves a go.mod, synthesizing a one-line file for modules
/// without one. This misclassifies real go.mod files with no requirements.
pub fn is_real_manifest(content: &[u8]) -> bool {
    match content.iter().position(|&b| b == b'\n') {
        Some(i) => i != content.len() - 1,
        None => !content.is_empty(),
    }
}

pub async fn has_real_manifest(
    source: &dyn ManifestSource,
    version: &str,
) -> Result<bool, FetchError> {
    let content = source.manifest(version).await?;
    Ok(is_real_manifest(&content))
}

/// Resolves the latest version, falling back from an incompatible latest
/// to the latest compatible tag when that tag has a real go.mod.
pub async fn resolve_latest(
    versions: &[String],
    source: &dyn ManifestSource,
) -> Result<Option<String>, FetchError> {
    let Some(latest) = latest_of(versions) else {
        return Ok(None);
    };
    if !is_incompatible(&latest) {
        return Ok(Some(latest));
    }

    let compatible: Vec<&str> = versions
        .iter()
        .map(String::as_str)
        .filter(|v| !is_incompatible(v) && !is_pseudo_version(v))
        .collect();
    let Some(latest_compatible) = latest_of(&compatible) else {
        debug!("Using latest incompatible version {}", latest);
        return Ok(Some(latest));
    };

    if has_real_manifest(source, &latest_compatible).await? {
        Ok(Some(latest_compatible))
    } else {
        Ok(Some(latest))
    }
}
