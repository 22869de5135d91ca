//! Retraction-aware latest version resolution
//!
//! The raw latest version is resolved first. Its go.mod may retract
//! versions (including itself); if it does, the latest is resolved again
//! over what remains.

use tracing::{debug, warn};

use crate::error::FetchError;
use crate::parser::traits::ManifestParser;
use crate::parser::types::RetractionRange;
use crate::version::latest::{ManifestSource, resolve_latest};

/// Reports whether any range retracts `version`.
pub fn is_retracted(ranges: &[RetractionRange], version: &str) -> bool {
    ranges.iter().any(|r| r.contains(version))
}

/// Resolves the latest version, ignoring versions retracted by the go.mod
/// file at the raw latest version.
///
/// Returns `Ok(None)` both for an empty version list and when every version
/// is retracted. A go.mod that fails to parse does not block resolution: the
/// unfiltered result is returned.
pub async fn resolve_with_retractions(
    versions: &[String],
    source: &dyn ManifestSource,
    parser: &dyn ManifestParser,
) -> Result<Option<String>, FetchError> {
    let Some(raw) = resolve_latest(versions, source).await? else {
        return Ok(None);
    };

    let content = source.manifest(&raw).await?;
    let ranges = match parser.parse_retractions(&content) {
        Ok(ranges) => ranges,
        Err(e) => {
            warn!("Bad go.mod file at {}: {}", raw, e);
            return Ok(Some(raw));
        }
    };

    let kept: Vec<String> = versions
        .iter()
        .filter(|v| !is_retracted(&ranges, v))
        .cloned()
        .collect();
    if kept.len() == versions.len() {
        return Ok(Some(raw));
    }

    debug!(
        "{} of {} versions retracted at {}",
        versions.len() - kept.len(),
        versions.len(),
        raw
    );
    resolve_latest(&kept, source).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::go_mod::GoModParser;
    use crate::parser::traits::{MockManifestParser, ParseError};
    use crate::version::latest::MockManifestSource;
    use mockall::predicate::eq;

    fn strings(versions: &[&str]) -> Vec<String> {
        versions.iter().map(|v| v.to_string()).collect()
    }

    fn source_serving(content: &'static str) -> MockManifestSource {
        let mut source = MockManifestSource::new();
        source
            .expect_manifest()
            .returning(move |_| Ok(content.as_bytes().to_vec()));
        source
    }

    #[tokio::test]
    async fn returns_raw_latest_when_nothing_retracted() {
        let source = source_serving("module m\n\ngo 1.21\n");
        let got = resolve_with_retractions(
            &strings(&["v1.0.0", "v2.0.0"]),
            &source,
            &GoModParser::new(),
        )
        .await
        .unwrap();
        assert_eq!(got.as_deref(), Some("v2.0.0"));
    }

    #[tokio::test]
    async fn skips_retracted_latest() {
        let source = source_serving("module m\n\nretract v2.0.0\n");
        let got = resolve_with_retractions(
            &strings(&["v1.0.0", "v2.0.0"]),
            &source,
            &GoModParser::new(),
        )
        .await
        .unwrap();
        assert_eq!(got.as_deref(), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn returns_none_when_everything_retracted() {
        let source = source_serving("module m\n\nretract (\n    v1.0.0\n    v2.0.0\n)\n");
        let got = resolve_with_retractions(
            &strings(&["v1.0.0", "v2.0.0"]),
            &source,
            &GoModParser::new(),
        )
        .await
        .unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn retracted_range_removes_every_version_inside() {
        let source = source_serving("module m\n\nretract [v1.1.0, v1.3.0]\n");
        let got = resolve_with_retractions(
            &strings(&["v1.0.0", "v1.1.0", "v1.2.0", "v1.3.0"]),
            &source,
            &GoModParser::new(),
        )
        .await
        .unwrap();
        assert_eq!(got.as_deref(), Some("v1.0.0"));
    }

    #[tokio::test]
    async fn parse_failure_keeps_raw_latest() {
        let source = source_serving("module m\n");
        let mut parser = MockManifestParser::new();
        parser.expect_parse_retractions().returning(|_| {
            Err(ParseError::InvalidSyntax {
                line: 1,
                message: "bad".to_string(),
            })
        });

        let got = resolve_with_retractions(&strings(&["v1.0.0", "v2.0.0"]), &source, &parser)
            .await
            .unwrap();
        assert_eq!(got.as_deref(), Some("v2.0.0"));
    }

    #[tokio::test]
    async fn empty_versions_fetch_nothing() {
        let mut source = MockManifestSource::new();
        source.expect_manifest().never();
        let mut parser = MockManifestParser::new();
        parser.expect_parse_retractions().never();

        let got = resolve_with_retractions(&[], &source, &parser).await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn manifest_fetch_error_propagates() {
        let mut source = MockManifestSource::new();
        source
            .expect_manifest()
            .with(eq("v2.0.0"))
            .returning(|_| Err(FetchError::Cancelled));

        let result = resolve_with_retractions(
            &strings(&["v1.0.0", "v2.0.0"]),
            &source,
            &GoModParser::new(),
        )
        .await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[test]
    fn is_retracted_checks_all_ranges() {
        let ranges = vec![
            RetractionRange::single("v1.0.0"),
            RetractionRange::new("v2.0.0", "v2.1.0"),
        ];
        assert!(is_retracted(&ranges, "v1.0.0"));
        assert!(is_retracted(&ranges, "v2.0.5"));
        assert!(!is_retracted(&ranges, "v1.5.0"));
        assert!(!is_retracted(&[], "v1.0.0"));
    }
}
