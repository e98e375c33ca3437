//! Resource requirements attached to a job at creation.

use serde::{Deserialize, Serialize};

use crate::errors::{CommonsError, Result};

/// GPU constraints within [`Requirements`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpusRequirements {
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GpusRequirements {
    pub fn count(count: u32) -> Self {
        Self {
            count,
            memory_mib: None,
            name: None,
        }
    }
}

/// Resource constraints for one job; immutable after submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mib: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<GpusRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shm_size_mib: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub interruptible: bool,
}

impl Requirements {
    /// True when no constraint is set at all.
    pub fn is_empty(&self) -> bool {
        self.cpus.is_none()
            && self.memory_mib.is_none()
            && self.gpus.is_none()
            && self.shm_size_mib.is_none()
            && !self.interruptible
    }
}

/// Parses a human memory size ("2048MiB", "2GiB", "2000MB", "512Mi", "1G")
/// into mebibytes.
///
/// Binary units (MiB/Mi, GiB/Gi) convert exactly; decimal units (MB/M,
/// GB/G) convert through bytes with the fraction floored, so `"2000MB"`
/// yields `1907`.
pub fn parse_memory(s: &str) -> Result<u64> {
    let normalized = s.replace(' ', "").to_lowercase();

    let (digits, multiplier): (&str, Multiplier) = if let Some(v) = normalized.strip_suffix("mib") {
        (v, Multiplier::Mebi(1))
    } else if let Some(v) = normalized.strip_suffix("gib") {
        (v, Multiplier::Mebi(1024))
    } else if let Some(v) = normalized.strip_suffix("mi") {
        (v, Multiplier::Mebi(1))
    } else if let Some(v) = normalized.strip_suffix("gi") {
        (v, Multiplier::Mebi(1024))
    } else if let Some(v) = normalized.strip_suffix("mb") {
        (v, Multiplier::Bytes(1000 * 1000))
    } else if let Some(v) = normalized.strip_suffix("gb") {
        (v, Multiplier::Bytes(1000 * 1000 * 1000))
    } else if let Some(v) = normalized.strip_suffix('m') {
        (v, Multiplier::Bytes(1000 * 1000))
    } else if let Some(v) = normalized.strip_suffix('g') {
        (v, Multiplier::Bytes(1000 * 1000 * 1000))
    } else {
        return Err(CommonsError::invalid_input(format!(
            "unknown memory unit: {s}"
        )));
    };

    let magnitude: u64 = digits.parse().map_err(|_| {
        CommonsError::invalid_input(format!("memory size is not a number: {s}"))
    })?;

    Ok(match multiplier {
        Multiplier::Mebi(factor) => magnitude * factor,
        Multiplier::Bytes(per_unit) => magnitude * per_unit / 1024 / 1024,
    })
}

enum Multiplier {
    /// Binary unit: factor in mebibytes.
    Mebi(u64),
    /// Decimal unit: bytes per unit, floored through bytes.
    Bytes(u64),
}
