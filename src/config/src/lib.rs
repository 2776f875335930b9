pub mod ids;
pub mod logger;

use std::env;

use once_cell::sync::Lazy;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Returns the process-wide configuration, parsed from the environment on
/// first access.
pub fn get_config() -> &'static Config {
    &CONFIG
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: Server,
    pub db: Db,
    pub cache: Cache,
    pub storage: Storage,
    pub rate_limit: RateLimit,
    pub limits: Limits,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
    /// Hostname suffix used to split `<pod>.<server_host>` subdomains.
    pub server_host: String,
    /// Pod routed to when a request arrives on the bare server host.
    pub root_pod: Option<String>,
    /// Enables the `/test-utils/*` surface regardless of debug_assertions.
    pub testing: bool,
}

#[derive(Debug, Clone)]
pub struct Db {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct Cache {
    pub pods_ttl_secs: u64,
    pub pods_cap: usize,
    pub streams_ttl_secs: u64,
    pub streams_cap: usize,
    pub single_records_ttl_secs: u64,
    pub single_records_cap: usize,
    pub single_record_max_bytes: usize,
    pub record_lists_ttl_secs: u64,
    pub record_lists_cap: usize,
    pub record_list_max_bytes: usize,
    pub record_list_max_records: usize,
}

#[derive(Debug, Clone)]
pub struct Storage {
    pub enabled: bool,
    pub base_path: String,
    pub base_url: String,
    pub min_external_size: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimit {
    pub enabled: bool,
    pub read_per_hour: u64,
    pub write_per_hour: u64,
    pub pod_create_per_hour: u64,
    pub stream_create_per_hour: u64,
}

#[derive(Debug, Clone)]
pub struct Limits {
    pub max_pod_name_len: usize,
    pub max_record_name_len: usize,
    pub max_stream_segment_len: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

impl Config {
    fn from_env() -> Self {
        Self {
            server: Server {
                bind_addr: env_or("WEBPODS_BIND_ADDR", "0.0.0.0"),
                port: env_parse("WEBPODS_PORT", 8080),
                server_host: env_or("WEBPODS_SERVER_HOST", "webpods.localhost"),
                root_pod: env::var("WEBPODS_ROOT_POD").ok(),
                testing: env_bool("WEBPODS_TESTING", cfg!(debug_assertions)),
            },
            db: Db {
                url: env_or("WEBPODS_DATABASE_URL", "sqlite::memory:"),
                max_connections: env_parse("WEBPODS_DB_MAX_CONNECTIONS", 10),
            },
            cache: Cache {
                pods_ttl_secs: env_parse("WEBPODS_CACHE_PODS_TTL", 300),
                pods_cap: env_parse("WEBPODS_CACHE_PODS_CAP", 1000),
                streams_ttl_secs: env_parse("WEBPODS_CACHE_STREAMS_TTL", 300),
                streams_cap: env_parse("WEBPODS_CACHE_STREAMS_CAP", 5000),
                single_records_ttl_secs: env_parse("WEBPODS_CACHE_RECORDS_TTL", 60),
                single_records_cap: env_parse("WEBPODS_CACHE_RECORDS_CAP", 10000),
                single_record_max_bytes: env_parse("WEBPODS_CACHE_RECORD_MAX_BYTES", 10 * 1024),
                record_lists_ttl_secs: env_parse("WEBPODS_CACHE_LISTS_TTL", 30),
                record_lists_cap: env_parse("WEBPODS_CACHE_LISTS_CAP", 500),
                record_list_max_bytes: env_parse("WEBPODS_CACHE_LIST_MAX_BYTES", 100 * 1024),
                record_list_max_records: env_parse("WEBPODS_CACHE_LIST_MAX_RECORDS", 1000),
            },
            storage: Storage {
                enabled: env_bool("WEBPODS_EXTERNAL_STORAGE_ENABLED", false),
                base_path: env_or("WEBPODS_STORAGE_BASE_PATH", "./data/blobs"),
                base_url: env_or("WEBPODS_STORAGE_BASE_URL", "http://localhost:8080/blobs"),
                min_external_size: env_parse("WEBPODS_STORAGE_MIN_EXTERNAL_SIZE", 256 * 1024),
            },
            rate_limit: RateLimit {
                enabled: env_bool("WEBPODS_RATE_LIMIT_ENABLED", true),
                read_per_hour: env_parse("WEBPODS_RATE_LIMIT_READ", 10_000),
                write_per_hour: env_parse("WEBPODS_RATE_LIMIT_WRITE", 1_000),
                pod_create_per_hour: env_parse("WEBPODS_RATE_LIMIT_POD_CREATE", 10),
                stream_create_per_hour: env_parse("WEBPODS_RATE_LIMIT_STREAM_CREATE", 100),
            },
            limits: Limits {
                max_pod_name_len: 63,
                max_record_name_len: 255,
                max_stream_segment_len: 255,
            },
        }
    }
}

/// Current UTC timestamp formatted as RFC 3339 (used for hash-chain inputs
/// and record/ownership timestamps).
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Current UTC timestamp in microseconds since epoch, used for table
/// `created_at`/`updated_at` columns.
pub fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Current UTC timestamp formatted for use inside a record *name*
/// (`[A-Za-z0-9._-]+`, spec.md §4.3) — no `:` or `+`, unlike `now_iso()`.
pub fn now_compact() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::from_env();
        assert_eq!(cfg.server.server_host, "webpods.localhost");
        assert!(cfg.cache.pods_cap > 0);
        assert!(cfg.rate_limit.enabled);
    }
}
