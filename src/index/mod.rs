//! Module index feed: page reader and duplicate-free cursor

pub mod client;
pub mod cursor;

pub use client::{FeedEvent, IndexClient};
pub use cursor::{FeedCursor, FeedPosition};
