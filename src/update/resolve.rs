//! Per-module latest version resolution

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{FetchError, ResolveError, UpdateError};
use crate::parser::traits::ManifestParser;
use crate::proxy::module::ProxyClient;
use crate::registry::store::ModuleStore;
use crate::registry::types::ModuleRecord;
use crate::version::retract::resolve_with_retractions;

/// Counts from one resolve phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveCounts {
    /// Records stored with a version (or with every version retracted)
    pub resolved: usize,
    /// Records stored with a soft error
    pub failed: usize,
}

/// The version set of a module: its tagged versions plus whatever the
/// proxy reports as latest.
///
/// A module without tagged versions whose `@latest` is absent has no
/// version information at all; that is [`ResolveError::NoVersions`].
pub async fn discover_versions(
    proxy: &ProxyClient,
    path: &str,
    cancel: &CancelToken,
) -> Result<Vec<String>, ResolveError> {
    let mut versions = proxy.list(path, cancel).await?;

    match proxy.latest(path, cancel).await {
        Ok(info) => {
            if !versions.contains(&info.version) {
                versions.push(info.version);
            }
        }
        Err(e) if e.is_not_found() => {
            debug!("No @latest for {}", path);
        }
        Err(e) => return Err(e.into()),
    }

    if versions.is_empty() {
        return Err(ResolveError::NoVersions);
    }
    Ok(versions)
}

/// The retraction-aware latest version of a module.
///
/// `Ok(None)` means every version is retracted.
pub async fn latest_module_version(
    proxy: &ProxyClient,
    parser: &dyn ManifestParser,
    path: &str,
    cancel: &CancelToken,
) -> Result<Option<String>, ResolveError> {
    let versions = discover_versions(proxy, path, cancel).await?;
    let manifests = proxy.manifests(path, cancel);
    let latest = resolve_with_retractions(&versions, &manifests, parser).await?;
    Ok(latest)
}

/// Brings one record up to date.
///
/// Soft failures come back as a record carrying the error text; only hard
/// failures are returned as `Err`.
pub async fn resolve_module(
    proxy: &ProxyClient,
    parser: &dyn ManifestParser,
    mut record: ModuleRecord,
    cancel: &CancelToken,
) -> Result<ModuleRecord, ResolveError> {
    let version = match record.latest_version.clone() {
        Some(version) => version,
        None => match latest_module_version(proxy, parser, &record.path, cancel).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                debug!("Every version of {} is retracted", record.path);
                record.set_all_retracted();
                return Ok(record);
            }
            Err(e) if e.is_soft() => {
                record.set_error(e.to_string());
                return Ok(record);
            }
            Err(e) => return Err(e),
        },
    };

    match proxy.info(&record.path, &version, cancel).await {
        Ok(info) => record.set_resolved(info),
        Err(e) if e.is_not_found() => record.set_error(e.to_string()),
        Err(e) => return Err(e.into()),
    }
    Ok(record)
}

/// Resolves every record with at most `concurrency` in flight, storing each
/// result as soon as it is known.
///
/// The first hard failure cancels everything still running or queued and is
/// returned.
///
/// All workers share the calling task, so a store write briefly pauses the
/// other in-flight resolutions. Writes happen one record at a time and are
/// short next to a proxy round trip.
pub async fn resolve_all<S: ModuleStore + ?Sized>(
    store: &S,
    proxy: &ProxyClient,
    parser: &dyn ManifestParser,
    records: Vec<ModuleRecord>,
    concurrency: usize,
    cancel: &CancelToken,
) -> Result<ResolveCounts, UpdateError> {
    let total = records.len();
    info!("Resolving {} modules with {} workers", total, concurrency);

    let mut results = stream::iter(records)
        .map(|record| async move {
            let path = record.path.clone();
            if cancel.is_cancelled() {
                return Err(UpdateError::Resolve {
                    path,
                    source: ResolveError::Fetch(FetchError::Cancelled),
                });
            }
            let record = resolve_module(proxy, parser, record, cancel)
                .await
                .map_err(|source| UpdateError::Resolve { path, source })?;
            store.update_module(&record)?;
            Ok::<_, UpdateError>(record)
        })
        .buffer_unordered(concurrency.max(1));

    let mut counts = ResolveCounts::default();
    while let Some(result) = results.next().await {
        match result {
            Ok(record) => {
                if let Some(error) = &record.error {
                    debug!("{}: {}", record.path, error);
                    counts.failed += 1;
                } else {
                    counts.resolved += 1;
                }
            }
            Err(e) => {
                warn!("Stopping resolution: {}", e);
                cancel.cancel();
                return Err(e);
            }
        }
    }

    info!(
        "Resolved {} of {} modules, {} with errors",
        counts.resolved, total, counts.failed
    );
    Ok(counts)
}
