use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which canonical store backs the query engine and ingestion writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process R-tree store, optionally persisted to a JSON snapshot.
    Memory,
    /// PostGIS + `pg_trgm` through `DATABASE_URL`.
    Postgres,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" => Ok(StoreBackend::Postgres),
            other => Err(format!("expected 'memory' or 'postgres', got '{other}'")),
        }
    }
}

/// Raw provider response cache behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchCacheMode {
    /// Always fetch from the network, never touch the cache directory.
    #[default]
    Off,
    /// Serve only from cached files.
    Read,
    /// Fetch from the network and persist every response.
    Write,
    /// Serve a cached file when present, otherwise fetch and persist.
    Auto,
}

impl std::fmt::Display for FetchCacheMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchCacheMode::Off => write!(f, "off"),
            FetchCacheMode::Read => write!(f, "read"),
            FetchCacheMode::Write => write!(f, "write"),
            FetchCacheMode::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for FetchCacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(FetchCacheMode::Off),
            "read" => Ok(FetchCacheMode::Read),
            "write" => Ok(FetchCacheMode::Write),
            "auto" => Ok(FetchCacheMode::Auto),
            other => Err(format!(
                "expected one of off, read, write, auto; got '{other}'"
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub snapshot_path: PathBuf,
    pub providers_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub fetch_cache: FetchCacheMode,
    pub fetch_cache_dir: PathBuf,
    pub ingest_cron: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("store", &self.store)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("snapshot_path", &self.snapshot_path)
            .field("providers_path", &self.providers_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("fetch_cache", &self.fetch_cache)
            .field("fetch_cache_dir", &self.fetch_cache_dir)
            .field("ingest_cron", &self.ingest_cron)
            .finish()
    }
}
