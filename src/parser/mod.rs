//! Parser layer
//! - traits.rs: ManifestParser trait and ParseError
//! - types.rs: Common types (RetractionRange)
//! - go_mod.rs: go.mod retraction parser

pub mod go_mod;
pub mod traits;
pub mod types;

pub use go_mod::GoModParser;
pub use traits::{ManifestParser, ParseError};
pub use types::RetractionRange;
