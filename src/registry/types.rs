use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::proxy::types::{InfoEntry, Origin};

/// How far a module has progressed through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModuleState {
    /// Seen in the feed, nothing resolved yet
    #[default]
    Index,
    /// Resolution finished with a version, or with every version retracted
    Resolved,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Index => "index",
            ModuleState::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown module state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for ModuleState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(ModuleState::Index),
            "resolved" => Ok(ModuleState::Resolved),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

/// One module known to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub path: String,
    pub state: ModuleState,
    pub latest_version: Option<String>,
    pub info_time: Option<String>,
    pub origin: Option<Origin>,
    pub error: Option<String>,
}

impl ModuleRecord {
    /// A record as first seen in the feed.
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            state: ModuleState::Index,
            latest_version: None,
            info_time: None,
            origin: None,
            error: None,
        }
    }

    /// Records without an error that still lack a version or its timestamp.
    pub fn needs_resolution(&self) -> bool {
        self.error.is_none() && (self.latest_version.is_none() || self.info_time.is_none())
    }

    /// Stores the version info of the resolved latest version.
    pub fn set_resolved(&mut self, info: InfoEntry) {
        self.state = ModuleState::Resolved;
        self.latest_version = Some(info.version);
        self.info_time = Some(info.time);
        self.origin = info.origin;
        self.error = None;
    }

    /// Marks a module whose versions are all retracted. There is no latest
    /// version and no error.
    pub fn set_all_retracted(&mut self) {
        self.state = ModuleState::Resolved;
        self.latest_version = None;
        self.info_time = None;
        self.origin = None;
        self.error = None;
    }

    /// Records a soft failure, discarding any partial version info.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.latest_version = None;
        self.info_time = None;
        self.origin = None;
        self.error = Some(message.into());
    }
}
