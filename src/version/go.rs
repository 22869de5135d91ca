//! Go module version kinds
//!
//! - Tagged release: v1.2.3
//! - Tagged prerelease: v1.2.3-rc.1
//! - Pseudo-version: v0.0.0-20210101000000-abcdef123456 (an untagged commit)
//! - Incompatible: v2.0.0+incompatible (a v2+ tag on a module without a /v2 path)

use std::sync::LazyLock;

use regex::Regex;

use crate::version::semver::is_valid;

static PSEUDO_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v[0-9]+\.(0\.0-|\d+\.\d+-([^+]*\.)?0\.)\d{14}-[A-Za-z0-9]+(\+[0-9A-Za-z-]+(\.[0-9A-Za-z-]+)*)?$",
    )
    .expect("pseudo-version regex is valid")
});

/// Reports whether a version is a pseudo-version.
///
/// Pseudo-version forms:
/// - vX.0.0-yyyymmddhhmmss-abcdefabcdef (no earlier tag)
/// - vX.Y.Z-pre.0.yyyymmddhhmmss-abcdefabcdef (after a prerelease tag)
/// - vX.Y.(Z+1)-0.yyyymmddhhmmss-abcdefabcdef (after a release tag)
pub fn is_pseudo_version(version: &str) -> bool {
    version.matches('-').count() >= 2 && is_valid(version) && PSEUDO_VERSION_RE.is_match(version)
}

/// Reports whether a version is a major-version-incompatible tag.
pub fn is_incompatible(version: &str) -> bool {
    version.ends_with("+incompatible")
}
