#[cfg(test)]
use mockall::automock;

use crate::error::StoreError;
use crate::registry::types::ModuleRecord;

/// The outcome of one feed drain, written in a single transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestBatch {
    /// Paths missing from the registry snapshot
    pub new_paths: Vec<String>,
    /// Timestamp to persist as the feed watermark, if any event was seen
    pub watermark: Option<String>,
}

/// Storage operations used by the updater
///
/// Every method is its own transaction. Implementations must serialize
/// writes: the updater calls `update_module` from many resolution tasks
/// at once.
#[cfg_attr(test, automock)]
pub trait ModuleStore: Send + Sync {
    /// Snapshot of every module record.
    fn load_all(&self) -> Result<Vec<ModuleRecord>, StoreError>;

    fn get_param(&self, name: &str) -> Result<Option<String>, StoreError>;

    fn upsert_param(&self, name: &str, value: &str) -> Result<(), StoreError>;

    /// Inserts the new paths and stores the watermark under `param`,
    /// atomically. Returns how many records were created.
    fn ingest(&self, param: &str, batch: &IngestBatch) -> Result<usize, StoreError>;

    /// Writes every field of one record.
    fn update_module(&self, record: &ModuleRecord) -> Result<(), StoreError>;
}
