//! # drover-link
//!
//! HTTP client for a drover hub: a remote service implementing the full
//! backend contract behind named endpoints.
//!
//! Every backend operation maps one-to-one onto an endpoint path scoped
//! under the hub name, pattern `/{hub_name}/{resource}/{action}` (for
//! example `jobs/get`, `runners/run`, `tags/add`, `secrets/list`).
//! Payloads are the drover data-model entities serialized as JSON.
//!
//! ```rust,no_run
//! use drover_link::HubClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HubClient::builder()
//!     .base_url("http://localhost:3000")
//!     .hub_name("main")
//!     .token("hub-token")
//!     .build()?;
//!
//! let heads = client
//!     .list_job_heads(&drover_commons::RepoAddress::new("acme", "models"), None)
//!     .await?;
//! println!("{} job heads", heads.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod schema;

pub use client::{HubClient, HubClientBuilder};
pub use error::{LinkError, Result};
