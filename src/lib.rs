//! Local registry of Go modules fed by the module index
//!
//! The index feed is read incrementally into a SQLite registry, then the
//! latest version of every new module is resolved against the module proxy,
//! skipping incompatible and retracted versions the way the go command does.

pub mod cancel;
pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod parser;
pub mod proxy;
pub mod registry;
pub mod update;
pub mod version;
