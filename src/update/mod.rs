//! Registry update runs
//!
//! A run ingests new module paths from the index feed, then resolves the
//! latest version of every module that still lacks one.
//!
//! - ingest.rs: feed draining under a wall-clock budget
//! - resolve.rs: per-module resolution and the bounded worker pool

pub mod ingest;
pub mod resolve;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::{EcoConfig, FEED_SINCE_PARAM};
use crate::error::UpdateError;
use crate::index::client::IndexClient;
use crate::index::cursor::FeedCursor;
use crate::parser::go_mod::GoModParser;
use crate::parser::traits::ManifestParser;
use crate::proxy::client::FetchClient;
use crate::proxy::module::ProxyClient;
use crate::registry::store::{IngestBatch, ModuleStore};
use crate::registry::types::ModuleRecord;
use self::ingest::drain_feed;
use self::resolve::resolve_all;

/// Knobs for one update run
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptions {
    /// Wall-clock budget for draining the feed
    pub duration: Duration,
    pub concurrency: usize,
    /// Fetch rate while reading the feed
    pub ingest_qps: f64,
    /// Fetch rate while resolving versions
    pub resolve_qps: f64,
    /// Skip the resolve phase
    pub skip_resolve: bool,
}

impl UpdateOptions {
    pub fn from_config(config: &EcoConfig) -> Self {
        Self {
            duration: config.update.duration(),
            concurrency: config.update.concurrency,
            ingest_qps: config.proxy.max_qps,
            resolve_qps: config.proxy.resolve_qps,
            skip_resolve: false,
        }
    }
}

/// Summary of an update run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub events_seen: usize,
    pub paths_seen: usize,
    pub paths_inserted: usize,
    pub watermark: Option<String>,
    pub resolved: usize,
    pub failed: usize,
    /// Upstream request rate of the last phase that ran
    pub qps: f64,
}

impl fmt::Display for UpdateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events, {} paths seen, {} new; resolved {} ({} with errors)",
            self.events_seen,
            self.paths_seen,
            self.paths_inserted,
            self.resolved + self.failed,
            self.failed
        )?;
        if let Some(watermark) = &self.watermark {
            write!(f, "; feed read to {}", watermark)?;
        }
        if self.qps > 0.0 {
            write!(f, "; proxy QPS = {:.1}", self.qps)?;
        }
        Ok(())
    }
}

/// Drives ingest and resolve against one store
pub struct Updater<S> {
    store: S,
    fetch: Arc<FetchClient>,
    proxy: ProxyClient,
    index: IndexClient,
    parser: Box<dyn ManifestParser>,
    options: UpdateOptions,
}

impl<S: ModuleStore> Updater<S> {
    pub fn new(
        store: S,
        fetch: Arc<FetchClient>,
        proxy_url: &str,
        index_url: &str,
        options: UpdateOptions,
    ) -> Self {
        Self {
            store,
            proxy: ProxyClient::new(Arc::clone(&fetch), proxy_url),
            index: IndexClient::new(Arc::clone(&fetch), index_url),
            fetch,
            parser: Box::new(GoModParser::new()),
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs both phases. The registry snapshot is read once, up front.
    pub async fn run(&self, cancel: &CancelToken) -> Result<UpdateReport, UpdateError> {
        let started = std::time::Instant::now();
        let snapshot = self.store.load_all()?;
        info!(
            "Read {} modules from registry in {:.1}s",
            snapshot.len(),
            started.elapsed().as_secs_f64()
        );

        let mut report = UpdateReport::default();
        let new_paths = self.ingest(&snapshot, cancel, &mut report).await?;

        if self.options.skip_resolve {
            return Ok(report);
        }

        let pending: Vec<ModuleRecord> = snapshot
            .into_iter()
            .filter(ModuleRecord::needs_resolution)
            .chain(new_paths.iter().map(|p| ModuleRecord::new(p)))
            .collect();
        self.resolve(pending, cancel, &mut report).await?;

        info!("Update finished: {}", report);
        Ok(report)
    }

    /// Drains the feed from the stored watermark and records unseen paths.
    /// Returns the paths that were new to the snapshot.
    async fn ingest(
        &self,
        snapshot: &[ModuleRecord],
        cancel: &CancelToken,
        report: &mut UpdateReport,
    ) -> Result<Vec<String>, UpdateError> {
        self.fetch.reset_qps();
        self.fetch.set_rate(self.options.ingest_qps);

        let since = self
            .store
            .get_param(FEED_SINCE_PARAM)?
            .unwrap_or_default();
        info!("Reading index from {:?}", since);

        let deadline = Instant::now() + self.options.duration;
        let mut cursor = FeedCursor::new(&self.index, &since, cancel.clone());
        let drained = drain_feed(&mut cursor, deadline).await;
        cursor.finish().map_err(UpdateError::Feed)?;

        let known: HashSet<&str> = snapshot.iter().map(|r| r.path.as_str()).collect();
        let new_paths: Vec<String> = drained
            .paths
            .iter()
            .filter(|p| !known.contains(p.as_str()))
            .cloned()
            .collect();
        info!(
            "Saw {} events, {} unique paths, {} new",
            drained.events,
            drained.paths.len(),
            new_paths.len()
        );

        let batch = IngestBatch {
            new_paths,
            watermark: drained.watermark.clone(),
        };
        report.paths_inserted = self.store.ingest(FEED_SINCE_PARAM, &batch)?;
        report.events_seen = drained.events;
        report.paths_seen = drained.paths.len();
        report.watermark = drained.watermark;
        report.qps = self.fetch.qps();

        debug!("Ingest done, proxy QPS = {:.1}", report.qps);
        Ok(batch.new_paths)
    }

    async fn resolve(
        &self,
        pending: Vec<ModuleRecord>,
        cancel: &CancelToken,
        report: &mut UpdateReport,
    ) -> Result<(), UpdateError> {
        self.fetch.reset_qps();
        self.fetch.set_rate(self.options.resolve_qps);

        let counts = resolve_all(
            &self.store,
            &self.proxy,
            self.parser.as_ref(),
            pending,
            self.options.concurrency,
            cancel,
        )
        .await?;

        report.resolved = counts.resolved;
        report.failed = counts.failed;
        report.qps = self.fetch.qps();
        Ok(())
    }
}
