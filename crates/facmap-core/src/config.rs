use crate::app_config::{AppConfig, Environment, FetchCacheMode, StoreBackend};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("FACMAP_ENV", "development"))?;

    let bind_addr = or_default("FACMAP_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("FACMAP_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("FACMAP_LOG_LEVEL", "info");

    let database_url = lookup("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
    let store = match lookup("FACMAP_STORE") {
        Ok(raw) => raw
            .parse::<StoreBackend>()
            .map_err(|reason| invalid("FACMAP_STORE", reason))?,
        Err(_) if database_url.is_some() => StoreBackend::Postgres,
        Err(_) => StoreBackend::Memory,
    };
    if store == StoreBackend::Postgres && database_url.is_none() {
        return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
    }

    let snapshot_path = PathBuf::from(or_default(
        "FACMAP_SNAPSHOT_PATH",
        "./data/facilities.json",
    ));
    let providers_path = PathBuf::from(or_default(
        "FACMAP_PROVIDERS_PATH",
        "./config/providers.yaml",
    ));

    let db_max_connections = parse_u32("FACMAP_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("FACMAP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("FACMAP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_u64("FACMAP_FETCH_TIMEOUT_SECS", "30")?;
    let fetch_user_agent = or_default("FACMAP_FETCH_USER_AGENT", "facmap/0.1 (facility-ingest)");
    let fetch_cache = or_default("FACMAP_FETCH_CACHE", "off")
        .parse::<FetchCacheMode>()
        .map_err(|reason| invalid("FACMAP_FETCH_CACHE", reason))?;
    let fetch_cache_dir = PathBuf::from(or_default("FACMAP_FETCH_CACHE_DIR", "./scrapers-output"));

    let ingest_cron = lookup("FACMAP_INGEST_CRON")
        .ok()
        .filter(|v| !v.trim().is_empty());

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        store,
        database_url,
        snapshot_path,
        providers_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        fetch_user_agent,
        fetch_cache,
        fetch_cache_dir,
        ingest_cron,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FACMAP_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
