use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Upstream endpoints
// =============================================================================

/// Default base URL of the module proxy
pub const DEFAULT_PROXY_URL: &str = "https://proxy.golang.org";

/// Default URL of the module index feed
pub const DEFAULT_INDEX_URL: &str = "https://index.golang.org/index";

/// Client identifier sent with every request
pub const DEFAULT_USER_AGENT: &str = "go-ecosystem";

// =============================================================================
// Rate limiting and caching
// =============================================================================

/// Default request rate for light work such as reading the feed
pub const DEFAULT_MAX_QPS: f64 = 50.0;

/// Request rate used while resolving versions in bulk
pub const DEFAULT_RESOLVE_QPS: f64 = 200.0;

/// Token bucket burst size
pub const DEFAULT_BURST: u32 = 10;

/// Lifetime of an on-disk response cache entry in seconds (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

// =============================================================================
// Update runs
// =============================================================================

/// Number of modules resolved concurrently
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Wall-clock budget for draining the feed in seconds
pub const DEFAULT_INGEST_DURATION_SECS: u64 = 60;

/// Name of the parameter holding the feed watermark
pub const FEED_SINCE_PARAM: &str = "feedSince";

/// Top-level configuration, usually read from a JSON file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EcoConfig {
    pub proxy: ProxyConfig,
    pub cache: CacheConfig,
    pub update: UpdateConfig,
}

/// Upstream service configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyConfig {
    pub proxy_url: String,
    pub index_url: String,
    pub max_qps: f64,
    pub resolve_qps: f64,
    pub burst: u32,
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            max_qps: DEFAULT_MAX_QPS,
            resolve_qps: DEFAULT_RESOLVE_QPS,
            burst: DEFAULT_BURST,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// On-disk response cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Cache directory; defaults to `<tmp>/goproxy-cache`
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            dir: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("goproxy-cache"))
    }
}

/// Update run configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateConfig {
    /// Wall-clock budget for the ingest phase in seconds
    pub duration_secs: u64,
    /// Worker limit for the resolve phase
    pub concurrency: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_INGEST_DURATION_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl UpdateConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl EcoConfig {
    /// Reads the configuration from a JSON file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let data = std::fs::read(path)?;
                serde_json::from_slice::<EcoConfig>(&data)?
            }
            None => EcoConfig::default(),
        };
        config.apply_env(std::env::var("GOPROXY").ok());
        Ok(config)
    }

    fn apply_env(&mut self, goproxy: Option<String>) {
        if let Some(url) = goproxy.filter(|u| !u.is_empty()) {
            // GOPROXY may be a list; only the first entry is a usable base URL.
            let first = url.split([',', '|']).next().unwrap_or_default();
            if first.starts_with("http") {
                self.proxy.proxy_url = first.trim_end_matches('/').to_string();
            }
        }
    }
}

/// Returns the path to the data directory.
/// Uses $GOECODIR if set, then $XDG_DATA_HOME/go-ecosystem,
/// then ~/.local/share/go-ecosystem, or ./go-ecosystem if none is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(
        std::env::var("GOECODIR").ok(),
        std::env::var("XDG_DATA_HOME").ok(),
        dirs::home_dir(),
    )
}

/// Returns the path to the registry database.
pub fn db_path() -> PathBuf {
    data_dir().join("db.sqlite")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("eco.log")
}

fn data_dir_with_env(
    eco_dir: Option<String>,
    xdg_data_home: Option<String>,
    home_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = eco_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }

    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("go-ecosystem")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn eco_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<EcoConfig>(json!({
            "proxy": {
                "maxQps": 5.0
            }
        }))
        .unwrap();

        assert_eq!(result.proxy.max_qps, 5.0);
        assert_eq!(result.proxy.burst, DEFAULT_BURST);
        assert_eq!(result.proxy.proxy_url, DEFAULT_PROXY_URL);
        assert_eq!(result.cache, CacheConfig::default());
        assert_eq!(result.update, UpdateConfig::default());
    }

    #[test]
    fn eco_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<EcoConfig>(json!({
            "proxy": {
                "proxyUrl": "http://localhost:3000",
                "indexUrl": "http://localhost:3001/index",
                "maxQps": 1.0,
                "resolveQps": 2.0,
                "burst": 3,
                "userAgent": "test"
            },
            "cache": {
                "enabled": true,
                "ttlSecs": 60,
                "dir": "/tmp/cache"
            },
            "update": {
                "durationSecs": 5,
                "concurrency": 2
            }
        }))
        .unwrap();

        assert_eq!(
            result,
            EcoConfig {
                proxy: ProxyConfig {
                    proxy_url: "http://localhost:3000".to_string(),
                    index_url: "http://localhost:3001/index".to_string(),
                    max_qps: 1.0,
                    resolve_qps: 2.0,
                    burst: 3,
                    user_agent: "test".to_string(),
                },
                cache: CacheConfig {
                    enabled: true,
                    ttl_secs: 60,
                    dir: Some(PathBuf::from("/tmp/cache")),
                },
                update: UpdateConfig {
                    duration_secs: 5,
                    concurrency: 2,
                },
            }
        );
    }

    #[test]
    fn apply_env_uses_first_goproxy_entry() {
        let mut config = EcoConfig::default();
        config.apply_env(Some("https://goproxy.example.com/,direct".to_string()));
        assert_eq!(config.proxy.proxy_url, "https://goproxy.example.com");
    }

    #[test]
    fn apply_env_ignores_non_url_goproxy() {
        let mut config = EcoConfig::default();
        config.apply_env(Some("off".to_string()));
        assert_eq!(config.proxy.proxy_url, DEFAULT_PROXY_URL);
    }

    #[test]
    #[serial]
    fn load_without_file_reads_goproxy_env() {
        // SAFETY: serialized with other env-mutating tests.
        unsafe { std::env::set_var("GOPROXY", "http://127.0.0.1:9999") };
        let config = EcoConfig::load(None).unwrap();
        unsafe { std::env::remove_var("GOPROXY") };

        assert_eq!(config.proxy.proxy_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn data_dir_with_env_prefers_eco_dir() {
        let path = data_dir_with_env(
            Some("/srv/eco".to_string()),
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/srv/eco"));
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            None,
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/go-ecosystem"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/go-ecosystem"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None, None);
        assert_eq!(path, PathBuf::from("./go-ecosystem"));
    }
}
