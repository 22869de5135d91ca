//! Response types of the module proxy

use serde::{Deserialize, Serialize};

/// Response of the `.info` and `@latest` endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InfoEntry {
    pub version: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

/// Where the proxy obtained a version from
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Origin {
    #[serde(rename = "VCS", default, skip_serializing_if = "String::is_empty")]
    pub vcs: String,
    #[serde(rename = "URL", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "Ref", default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    #[serde(rename = "Hash", default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}
