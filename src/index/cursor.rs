//! Resumable, duplicate-free iteration over the index feed

use std::collections::HashSet;

use crate::cancel::CancelToken;
use crate::error::FetchError;
use crate::index::client::{FeedEvent, IndexClient};

/// How far a cursor has read: the last yielded timestamp and every event
/// yielded at exactly that timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPosition {
    pub since: String,
    seen: HashSet<FeedEvent>,
}

impl FeedPosition {
    /// A position known only by its timestamp, e.g. a persisted watermark.
    pub fn at(since: &str) -> Self {
        Self {
            since: since.to_string(),
            seen: HashSet::new(),
        }
    }

    fn record(&mut self, event: &FeedEvent) {
        if event.timestamp != self.since {
            self.since = event.timestamp.clone();
            self.seen.clear();
        }
        self.seen.insert(event.clone());
    }
}

/// Pulls feed events page by page starting at a watermark.
///
/// Pages overlap at their boundary timestamp; events already returned at
/// that timestamp are suppressed, so no event is yielded twice. The cursor
/// stops when a page has nothing new. A fetch failure also stops it; the
/// failure is reported by [`FeedCursor::finish`], never by [`FeedCursor::next`].
pub struct FeedCursor<'a> {
    client: &'a IndexClient,
    cancel: CancelToken,
    since: String,
    limit: usize,
    page: Vec<FeedEvent>,
    pos: usize,
    fresh: usize,
    fetched: bool,
    /// Events from the previous page sharing its last timestamp.
    boundary: HashSet<FeedEvent>,
    position: FeedPosition,
    done: bool,
    err: Option<FetchError>,
}

impl<'a> FeedCursor<'a> {
    pub fn new(client: &'a IndexClient, since: &str, cancel: CancelToken) -> Self {
        Self::resume(client, FeedPosition::at(since), cancel)
    }

    /// Continues from a position returned by an earlier cursor, without
    /// repeating the events it already yielded at that timestamp.
    pub fn resume(client: &'a IndexClient, position: FeedPosition, cancel: CancelToken) -> Self {
        Self {
            client,
            cancel,
            since: position.since.clone(),
            limit: 0,
            page: Vec::new(),
            pos: 0,
            fresh: 0,
            fetched: false,
            boundary: position.seen.clone(),
            position,
            done: false,
            err: None,
        }
    }

    /// Caps the number of events requested per page. Zero means no cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Watermark of the page currently being read.
    pub fn since(&self) -> &str {
        &self.since
    }

    /// Position after the last event yielded so far.
    pub fn position(&self) -> &FeedPosition {
        &self.position
    }

    /// Returns the next unseen event, or `None` once the feed is exhausted or failed.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            if self.done {
                return None;
            }

            while let Some(event) = self.page.get(self.pos) {
                self.pos += 1;
                if self.boundary.contains(event) {
                    continue;
                }
                self.fresh += 1;
                self.position.record(event);
                return Some(event.clone());
            }

            if self.fetched {
                if self.fresh == 0 {
                    self.done = true;
                    return None;
                }
                self.advance();
            }

            match self.client.read_page(&self.since, self.limit, &self.cancel).await {
                Ok(page) => {
                    self.page = page;
                    self.pos = 0;
                    self.fresh = 0;
                    self.fetched = true;
                }
                Err(e) => {
                    self.err.get_or_insert(e);
                    self.done = true;
                    return None;
                }
            }
        }
    }

    /// Moves the watermark to the last event of the current page and
    /// remembers the events that share its timestamp.
    fn advance(&mut self) {
        let Some(last) = self.page.last() else {
            return;
        };
        self.since = last.timestamp.clone();
        self.boundary = self
            .page
            .iter()
            .rev()
            .take_while(|e| e.timestamp == self.since)
            .cloned()
            .collect();
    }

    /// Ends iteration, returning the first fetch failure if there was one.
    pub fn finish(self) -> Result<(), FetchError> {
        match self.err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
