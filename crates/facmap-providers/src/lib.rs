//! Provider adapters and the ingestion pipeline.
//!
//! Each external source implements [`ProviderAdapter`]; raw responses are
//! obtained through a [`RawFetcher`], which can be wrapped with a disk
//! cache. [`run_ingestion`] runs the enabled adapters in fold order,
//! deduplicates, and replaces the store contents in one step.

pub mod adapter;
pub mod error;
pub mod fetch;
pub mod medicover;
pub mod multisport;
pub mod pipeline;
mod raw;
pub mod throttle;

pub use adapter::{run_adapter, AdapterRun, ProviderAdapter, ProviderReport, RawItem, ValidationError};
pub use error::{IngestError, ProviderError};
pub use fetch::{fetcher_from_config, CachingFetcher, FetchRequest, HttpFetcher, RawFetcher};
#[cfg(any(test, feature = "test-util"))]
pub use fetch::StaticFetcher;
pub use medicover::MedicoverAdapter;
pub use multisport::MultisportAdapter;
pub use pipeline::{build_adapters, run_ingestion, IngestOptions, IngestReport};
pub use throttle::Throttle;
