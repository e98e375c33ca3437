//! # drover
//!
//! Client for submitting runs of jobs to pluggable execution backends (a
//! local machine, a cloud compute fleet backed by object storage, or a
//! remote orchestration hub) and for tracking their lifecycle, artifacts,
//! tags and inter-run dependencies.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use drover::{BackendRegistry, DroverConfig};
//! use drover::commons::RepoAddress;
//!
//! # async fn example() -> anyhow::Result<()> {
//! drover::logging::init_logging("info")?;
//!
//! let config = DroverConfig::load()?;
//! let registry = BackendRegistry::from_config(&config);
//! let backend = registry.current()?;
//!
//! let repo = RepoAddress::new("acme", "models");
//! for run in backend.list_run_heads(&repo, None).await? {
//!     println!("{}  {}", run.run_name, run.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The heavy lifting lives in the member crates: `drover-commons` (data
//! model), `drover-store` (head encoding and artifact transfer over an
//! object store), `drover-link` (hub wire client) and `drover-backend` (the
//! contract and its local/cloud/hub implementations). This facade adds
//! configuration loading, logging setup and the backend registry.

pub mod config;
pub mod logging;
pub mod registry;

pub use config::DroverConfig;
pub use registry::BackendRegistry;

pub use drover_backend::{
    aggregate_run_heads, parse_dep_token, resolve_dep, submit_provider_jobs, Backend,
    BackendError, JobProvider, LogEventStream, Result,
};

/// The shared data model.
pub mod commons {
    pub use drover_commons::*;
}

/// Head encoding and artifact addressing (advanced use).
pub mod store {
    pub use drover_store::*;
}

/// The hub wire client (advanced use).
pub mod link {
    pub use drover_link::*;
}
