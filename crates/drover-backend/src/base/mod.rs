//! Shared head/artifact scheme implementation.
//!
//! Both store-backed variants (local filesystem, cloud object store) run the
//! exact same logic over a [`drover_store::Storage`] handle; these modules
//! hold that logic as free functions so the variants stay thin.

pub mod jobs;
pub mod logs;
pub mod runs;
pub mod secrets;
pub mod tags;
