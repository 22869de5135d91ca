//! Common types for parsers

use crate::version::semver::compare;

/// An inclusive range of retracted versions, `[low, high]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractionRange {
    pub low: String,
    pub high: String,
}

impl RetractionRange {
    pub fn new(low: &str, high: &str) -> Self {
        Self {
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// A range retracting exactly one version.
    pub fn single(version: &str) -> Self {
        Self::new(version, version)
    }

    /// Reports whether `version` falls inside the range in semver order.
    pub fn contains(&self, version: &str) -> bool {
        compare(version, &self.low).is_ge() && compare(version, &self.high).is_le()
    }
}
