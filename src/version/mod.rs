//! Version resolution layer
//!
//! Pure ranking of Go module versions plus the go.mod-driven refinements
//! (incompatible fallback and retractions).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   semver    │────▶│   latest    │────▶│   retract   │
//! │  (compare)  │     │ (rank/pick) │     │ (re-resolve)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │                   │
//!        │                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │     go      │     │ManifestSrc  │     │ManifestParse│
//! │(pseudo/+inc)│     │ (go.mod I/O)│     │ (retract)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`semver`]: Go semver parsing and ordering
//! - [`go`]: Pseudo-version and incompatible-version detection
//! - [`latest`]: Ranking, latest selection, incompatible fallback
//! - [`retract`]: Retraction-aware resolution

pub mod go;
pub mod latest;
pub mod retract;
pub mod semver;

pub use latest::{ManifestSource, later, latest_of, resolve_latest};
pub use retract::resolve_with_retractions;
