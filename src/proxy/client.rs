//! Rate-limited, optionally cached fetch client
//!
//! Every upstream request made by this crate goes through [`FetchClient`].
//! One instance is built at startup and shared, so the token bucket caps the
//! combined request rate of all callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::{CacheConfig, ProxyConfig};
use crate::error::FetchError;
use crate::proxy::disk_cache::{CachedResponse, DiskCache};
use crate::proxy::limiter::RateLimiter;

/// Header telling the proxy not to fetch modules it has not already cached
pub const DISABLE_MODULE_FETCH_HEADER: &str = "Disable-Module-Fetch";

pub struct FetchClient {
    http: reqwest::Client,
    limiter: Mutex<Arc<RateLimiter>>,
    calls: AtomicU64,
    started: Mutex<Option<Instant>>,
    cache: Option<DiskCache>,
}

impl FetchClient {
    /// Creates a client limited to `qps` requests per second.
    pub fn new(
        user_agent: &str,
        qps: f64,
        burst: u32,
        cache: Option<DiskCache>,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            http,
            limiter: Mutex::new(Arc::new(RateLimiter::new(qps, burst))),
            calls: AtomicU64::new(0),
            started: Mutex::new(None),
            cache,
        })
    }

    pub fn from_config(proxy: &ProxyConfig, cache: &CacheConfig) -> Result<Self, FetchError> {
        let disk_cache = if cache.enabled {
            Some(DiskCache::new(&cache.dir(), cache.ttl())?)
        } else {
            None
        };
        Self::new(&proxy.user_agent, proxy.max_qps, proxy.burst, disk_cache)
    }

    /// Replaces the limiter. Requests already waiting keep their old reservation.
    pub fn set_rate(&self, qps: f64) {
        let mut limiter = self.limiter.lock().unwrap_or_else(|e| e.into_inner());
        let burst = limiter.burst();
        debug!("Setting fetch rate to {} qps (burst {})", qps, burst);
        *limiter = Arc::new(RateLimiter::new(qps, burst));
    }

    pub fn rate(&self) -> f64 {
        self.limiter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rate()
    }

    /// Number of requests issued since the last reset.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Requests per second since the limiter was first used after the last reset.
    pub fn qps(&self) -> f64 {
        let started = *self.started.lock().unwrap_or_else(|e| e.into_inner());
        match started {
            Some(start) => {
                let secs = start.elapsed().as_secs_f64();
                if secs > 0.0 {
                    self.calls() as f64 / secs
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    pub fn reset_qps(&self) {
        self.calls.store(0, Ordering::Relaxed);
        *self.started.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn current_limiter(&self) -> Arc<RateLimiter> {
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert_with(Instant::now);
        Arc::clone(&self.limiter.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Fetches `url`, waiting for the rate limiter first. Never retries.
    pub async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, FetchError> {
        self.current_limiter().acquire(cancel).await?;

        debug!("GET {}", url);
        let request = self
            .http
            .get(url)
            .header(DISABLE_MODULE_FETCH_HEADER, "true");
        self.calls.fetch_add(1, Ordering::Relaxed);

        let send = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            Ok::<_, FetchError>(response.bytes().await?.to_vec())
        };

        tokio::select! {
            result = send => result,
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
        }
    }

    /// Like [`FetchClient::fetch`], but consults and fills the disk cache when enabled.
    ///
    /// Status errors are cached as well as successes. Transport errors are not.
    pub async fn fetch_cached(
        &self,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        let Some(cache) = &self.cache else {
            return self.fetch(url, cancel).await;
        };

        if let Some(entry) = cache.get(url).await? {
            debug!("Cache hit for {}", url);
            return match entry {
                CachedResponse::Body(body) => Ok(body),
                CachedResponse::Status(status) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
            };
        }

        let result = self.fetch(url, cancel).await;
        match &result {
            Ok(body) => cache.put(url, 200, body).await?,
            Err(FetchError::Status { status, .. }) => cache.put(url, *status, &[]).await?,
            Err(_) => {}
        }
        result
    }
}
