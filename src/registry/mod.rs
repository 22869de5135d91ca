//! Module registry
//! - types.rs: ModuleRecord and ModuleState
//! - store.rs: ModuleStore trait used by the updater
//! - sqlite.rs: SQLite implementation

pub mod sqlite;
pub mod store;
pub mod types;

pub use sqlite::Registry;
pub use store::{IngestBatch, ModuleStore};
pub use types::{ModuleRecord, ModuleState};
