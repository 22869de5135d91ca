//! Feed draining for the ingest phase

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::DateTime;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::index::cursor::FeedCursor;

/// What one drain of the feed observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drained {
    pub events: usize,
    pub paths: BTreeSet<String>,
    /// Latest timestamp observed, if any event was seen
    pub watermark: Option<String>,
}

/// Reads events until the feed is exhausted or `deadline` passes.
///
/// Hitting the deadline is a normal way to finish. Fetch failures are left
/// in the cursor for [`FeedCursor::finish`].
pub async fn drain_feed(cursor: &mut FeedCursor<'_>, deadline: Instant) -> Drained {
    let mut drained = Drained::default();
    loop {
        match timeout_at(deadline, cursor.next()).await {
            Ok(Some(event)) => {
                drained.events += 1;
                let newer = drained
                    .watermark
                    .as_deref()
                    .is_none_or(|w| compare_timestamps(&event.timestamp, w).is_gt());
                if newer {
                    drained.watermark = Some(event.timestamp);
                }
                drained.paths.insert(event.path);
            }
            Ok(None) => break,
            Err(_) => {
                debug!("Ingest deadline reached after {} events", drained.events);
                break;
            }
        }
    }
    drained
}

/// Orders feed timestamps by time, falling back to text order when either
/// is not RFC 3339.
fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
