//! Upstream access layer
//!
//! # Modules
//!
//! - [`client`]: Shared rate-limited fetch client with optional disk cache
//! - [`limiter`]: Token bucket used by the fetch client
//! - [`disk_cache`]: One-file-per-URL response cache, including negative outcomes
//! - [`module`]: Typed module proxy endpoints (list, latest, info, mod, zip)
//! - [`types`]: Proxy response types

pub mod client;
pub mod disk_cache;
pub mod limiter;
pub mod module;
pub mod types;

pub use client::FetchClient;
pub use disk_cache::DiskCache;
pub use module::ProxyClient;
pub use types::{InfoEntry, Origin};
