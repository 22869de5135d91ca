//! Go-flavoured semantic version ordering
//!
//! Go versions carry a leading `v`, allow the shorthands `v1` and `v1.2`
//! (meaning `v1.0.0` and `v1.2.0`), and ignore build metadata when comparing.
//! Invalid versions sort below every valid version and equal to each other.

use std::cmp::Ordering;

use semver::{BuildMetadata, Version};

/// Parses a Go version string. Returns `None` if it is not valid.
pub fn parse_version(version: &str) -> Option<Version> {
    let rest = version.strip_prefix('v')?;
    let parts: Vec<&str> = rest.split('.').collect();

    // Shorthands may not carry a prerelease or build suffix.
    let normalized = match parts.len() {
        1 if is_number(parts[0]) => format!("{}.0.0", parts[0]),
        2 if is_number(parts[0]) && is_number(parts[1]) => format!("{}.{}.0", parts[0], parts[1]),
        1 | 2 => return None,
        _ => rest.to_string(),
    };

    let mut parsed = Version::parse(&normalized).ok()?;
    parsed.build = BuildMetadata::EMPTY;
    Some(parsed)
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'))
}

pub fn is_valid(version: &str) -> bool {
    parse_version(version).is_some()
}

/// Reports whether a valid version has a prerelease suffix.
pub fn is_prerelease(version: &str) -> bool {
    parse_version(version).is_some_and(|v| !v.pre.is_empty())
}

/// Compares two versions.
pub fn compare(v1: &str, v2: &str) -> Ordering {
    match (parse_version(v1), parse_version(v2)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("v1.2.3", true)]
    #[case("v1.2", true)]
    #[case("v1", true)]
    #[case("v1.2.3-pre.1", true)]
    #[case("v1.2.3+meta", true)]
    #[case("v2.0.0+incompatible", true)]
    #[case("v0.0.0-20180713131340-b395d2d6f5ee", true)]
    #[case("1.2.3", false)]
    #[case("v1.2-pre", false)]
    #[case("v01.2.3", false)]
    #[case("v1.2.3.4", false)]
    #[case("", false)]
    fn is_valid_accepts_go_versions(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_valid(version), expected);
    }

    #[rstest]
    #[case("v1.2.3", "v1.2.4", Ordering::Less)]
    #[case("v1.10.0", "v1.9.0", Ordering::Greater)]
    #[case("v1.2", "v1.2.0", Ordering::Equal)]
    #[case("v1", "v1.0.0", Ordering::Equal)]
    #[case("v1.0.0+a", "v1.0.0+b", Ordering::Equal)]
    #[case("v1.0.0-alpha", "v1.0.0", Ordering::Less)]
    #[case("v1.0.0-alpha.2", "v1.0.0-alpha.10", Ordering::Less)]
    #[case("v1.0.0-rc.1", "v1.0.0-beta", Ordering::Greater)]
    #[case("bad", "v0.0.1", Ordering::Less)]
    #[case("bad", "worse", Ordering::Equal)]
    fn compare_orders_versions(#[case] v1: &str, #[case] v2: &str, #[case] expected: Ordering) {
        assert_eq!(compare(v1, v2), expected);
    }

    #[rstest]
    #[case("v1.0.0", false)]
    #[case("v1.0.0-pre", true)]
    #[case("v0.0.0-20190124233150-8f7fa2680c82", true)]
    #[case("v2.0.0+incompatible", false)]
    #[case("garbage", false)]
    fn is_prerelease_detects_suffix(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_prerelease(version), expected);
    }
}
