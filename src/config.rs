use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `sqlite` | `mysql` | `postgres` | `memory`
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_link_ttl")]
    pub link_ttl_secs: u64,
    #[serde(default = "default_link_capacity")]
    pub link_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Dedup lookback for the (link, ip, user-agent) triple
    #[serde(default = "default_dedup_window")]
    pub dedup_window_secs: i64,
    /// Attribution cookie lifetime; matches the ad platforms' 30-day window
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: i64,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    #[serde(default = "default_user_agent_max_len")]
    pub user_agent_max_len: usize,
    #[serde(default = "default_site_root_url")]
    pub site_root_url: String,
    #[serde(default = "default_not_found_url")]
    pub not_found_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,
    #[serde(default = "default_graph_api_version")]
    pub graph_api_version: String,
    #[serde(default)]
    pub test_event_code: Option<String>,
    #[serde(default = "default_capi_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
    /// `plain` | `json`
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_storage_backend() -> String {
    "sqlite".to_string()
}

fn default_database_url() -> String {
    "sqlite://sellerport.db?mode=rwc".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_link_ttl() -> u64 {
    60
}

fn default_link_capacity() -> u64 {
    10_000
}

fn default_dedup_window() -> i64 {
    3600
}

fn default_cookie_max_age() -> i64 {
    2_592_000
}

fn default_flush_interval() -> u64 {
    10
}

fn default_flush_threshold() -> usize {
    500
}

fn default_user_agent_max_len() -> usize {
    500
}

fn default_site_root_url() -> String {
    "https://sellerport.io".to_string()
}

fn default_not_found_url() -> String {
    "https://sellerport.io/link-not-found".to_string()
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_graph_api_version() -> String {
    "v18.0".to_string()
}

fn default_capi_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "plain".to_string()
}

fn default_max_backups() -> u32 {
    7
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
            tracking: TrackingConfig::default(),
            meta: MetaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            retry_count: default_retry_count(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            link_ttl_secs: default_link_ttl(),
            link_capacity: default_link_capacity(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dedup_window_secs: default_dedup_window(),
            cookie_max_age_secs: default_cookie_max_age(),
            secure_cookies: false,
            flush_interval_secs: default_flush_interval(),
            flush_threshold: default_flush_threshold(),
            user_agent_max_len: default_user_agent_max_len(),
            site_root_url: default_site_root_url(),
            not_found_url: default_not_found_url(),
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            graph_api_base: default_graph_api_base(),
            graph_api_version: default_graph_api_version(),
            test_event_code: None,
            timeout_secs: default_capi_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            format: default_log_format(),
            enable_rotation: false,
            max_backups: default_max_backups(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file with environment variable fallback
    pub fn load() -> Self {
        let mut config = Self::load_from_file();
        config.override_with_env();
        config
    }

    fn load_from_file() -> Self {
        let config_paths = [
            "sellerport.toml",
            "config.toml",
            "config/sellerport.toml",
            "/etc/sellerport/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                debug!("Loading config from: {}", path);
                match fs::read_to_string(path) {
                    Ok(content) => match toml::from_str::<Config>(&content) {
                        Ok(config) => {
                            debug!("Successfully loaded config from: {}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file {}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file {}: {}", path, e);
                    }
                }
            }
        }

        debug!("No config file found, using defaults");
        Self::default()
    }

    fn override_with_env(&mut self) {
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(workers) = env::var("SERVER_WORKERS") {
            if let Ok(workers) = workers.parse() {
                self.server.workers = workers;
            }
        }

        if let Ok(backend) = env::var("STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
        if let Ok(database_url) = env::var("DATABASE_URL") {
            self.storage.database_url = database_url;
        }
        if let Ok(pool_size) = env::var("DATABASE_POOL_SIZE") {
            if let Ok(pool_size) = pool_size.parse() {
                self.storage.pool_size = pool_size;
            }
        }

        if let Ok(secure) = env::var("SECURE_COOKIES") {
            self.tracking.secure_cookies = secure == "true";
        }
        if let Ok(site_root) = env::var("SITE_ROOT_URL") {
            self.tracking.site_root_url = site_root;
        }
        if let Ok(not_found) = env::var("NOT_FOUND_URL") {
            self.tracking.not_found_url = not_found;
        }

        if let Ok(version) = env::var("META_GRAPH_API_VERSION") {
            self.meta.graph_api_version = version;
        }
        if let Ok(code) = env::var("META_TEST_EVENT_CODE") {
            self.meta.test_event_code = Some(code);
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            self.logging.level = log_level;
        }
        if let Ok(log_file) = env::var("LOG_FILE") {
            self.logging.file = Some(log_file);
        }
    }
}

// Global configuration instance
use std::sync::OnceLock;
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::load)
}

/// Initialize the global configuration
pub fn init_config() {
    CONFIG.get_or_init(Config::load);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.tracking.dedup_window_secs, 3600);
        assert_eq!(config.tracking.cookie_max_age_secs, 2_592_000);
        assert_eq!(config.tracking.user_agent_max_len, 500);
        assert_eq!(config.meta.graph_api_version, "v18.0");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_src = r#"
            [server]
            port = 9090

            [tracking]
            secure_cookies = true
        "#;
        let config: Config = toml::from_str(toml_src).expect("partial config should parse");
        assert_eq!(config.server.port, 9090);
        assert!(config.tracking.secure_cookies);
        // untouched sections keep defaults
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(config.tracking.flush_threshold, 500);
    }
}
