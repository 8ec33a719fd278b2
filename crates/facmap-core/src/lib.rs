//! Canonical model, query types, and pure algorithms shared by every
//! facmap crate.

pub mod app_config;
pub mod cluster;
pub mod config;
pub mod dedup;
pub mod facility;
pub mod providers;
pub mod query;
pub mod similarity;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, FetchCacheMode, StoreBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use facility::{
    dedup_tags, CanonicalFacility, Facility, Location, OpenHours, Provider, Source, TagField,
    DAYS_PER_WEEK,
};
pub use providers::{
    load_providers, parse_providers, MedicoverCard, MedicoverConfig, MultisportConfig,
    ProvidersFile,
};
pub use query::{
    parse_facility_id, Bounds, ClusterGroup, ClusterObject, FuzzyMatch, MapObject, OrderBy, Page,
    QueryError, Selection, SingletonObject, TagFilters, FUZZY_LIMIT, MAX_CLUSTERS, PAGE_SIZE,
    SIMILARITY_THRESHOLD,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("unknown tag field: {0}")]
    UnknownTagField(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read providers file {path}: {source}")]
    ProvidersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse providers file: {0}")]
    ProvidersFileParse(#[source] serde_yaml::Error),

    #[error("invalid provider configuration: {0}")]
    Validation(String),
}
