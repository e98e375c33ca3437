// Snowflake ID generator
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ids::JobId;

/// Snowflake ID generator for time-ordered, collision-resistant job ids.
///
/// Format (64 bits):
/// - 41 bits: timestamp in milliseconds since custom epoch
/// - 10 bits: worker ID (derived per process)
/// - 12 bits: sequence number
///
/// There is no central coordinator assigning job ids; every submitting
/// client runs its own generator. The worker-id bits keep two clients
/// submitting within the same millisecond from colliding.
pub struct SnowflakeGenerator {
    /// Worker ID (0-1023)
    worker_id: u16,

    /// Custom epoch (milliseconds since Unix epoch)
    epoch: u64,

    /// State protected by mutex
    state: Mutex<GeneratorState>,
}

struct GeneratorState {
    last_timestamp: u64,
    sequence: u16,
}

impl SnowflakeGenerator {
    /// Custom epoch: 2023-01-01 00:00:00 UTC
    pub const DEFAULT_EPOCH: u64 = 1672531200000;

    /// Maximum worker ID
    pub const MAX_WORKER_ID: u16 = 1023;

    /// Maximum sequence number
    const MAX_SEQUENCE: u16 = 4095;

    /// Create a new generator with the given worker id.
    pub fn new(worker_id: u16) -> Self {
        assert!(
            worker_id <= Self::MAX_WORKER_ID,
            "worker_id must be <= {}",
            Self::MAX_WORKER_ID
        );
        Self {
            worker_id,
            epoch: Self::DEFAULT_EPOCH,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// Create a generator with a worker id derived from the process id.
    pub fn for_process() -> Self {
        Self::new((std::process::id() % (Self::MAX_WORKER_ID as u32 + 1)) as u16)
    }

    /// Generate the next id.
    pub fn next_id(&self) -> Result<i64, String> {
        let mut state = self.state.lock().map_err(|e| e.to_string())?;

        let mut timestamp = self.current_timestamp()?;

        // Handle clock going backwards
        if timestamp < state.last_timestamp {
            return Err(format!(
                "clock moved backwards; refusing to generate id for {} ms",
                state.last_timestamp - timestamp
            ));
        }

        if timestamp == state.last_timestamp {
            // Same millisecond - increment sequence
            state.sequence = (state.sequence + 1) & Self::MAX_SEQUENCE;
            if state.sequence == 0 {
                // Sequence exhausted - wait for next millisecond
                while timestamp == state.last_timestamp {
                    timestamp = self.current_timestamp()?;
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = timestamp;

        let id = ((timestamp as i64) << 22)
            | ((self.worker_id as i64) << 12)
            | (state.sequence as i64);
        Ok(id)
    }

    /// Generate the next id rendered as a compact hexadecimal [`JobId`].
    pub fn next_job_id(&self) -> Result<JobId, String> {
        Ok(JobId::new(format!("{:x}", self.next_id()?)))
    }

    fn current_timestamp(&self) -> Result<u64, String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_millis() as u64;
        Ok(now.saturating_sub(self.epoch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let gen = SnowflakeGenerator::new(7);
        let a = gen.next_id().unwrap();
        let b = gen.next_id().unwrap();
        let c = gen.next_id().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_job_ids_are_distinct() {
        let gen = SnowflakeGenerator::for_process();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(gen.next_job_id().unwrap()));
        }
    }
}
