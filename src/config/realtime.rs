//! Real-time collaboration configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning for rooms and client connections.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Bounded inbound queue per room. Producers wait when it is full.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Bounded outbound queue per connection. A connection whose queue is
    /// full when a broadcast arrives is evicted.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Deadline for each storage call made while applying an edit (0 = none)
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    /// Interval between idle-room sweeps (0 = rooms are never reaped)
    #[serde(default = "default_room_reap_interval")]
    pub room_reap_interval_secs: u64,
}

impl RealtimeConfig {
    /// Sweep interval, or `None` when reaping is disabled.
    pub fn room_reap_interval(&self) -> Option<Duration> {
        (self.room_reap_interval_secs > 0).then(|| Duration::from_secs(self.room_reap_interval_secs))
    }

    /// Validate realtime configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.inbound_capacity == 0 {
            return Err(ValidationError::InvalidCapacity("realtime.inbound_capacity"));
        }
        if self.outbound_capacity == 0 {
            return Err(ValidationError::InvalidCapacity("realtime.outbound_capacity"));
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: default_inbound_capacity(),
            outbound_capacity: default_outbound_capacity(),
            operation_timeout_secs: default_operation_timeout(),
            room_reap_interval_secs: default_room_reap_interval(),
        }
    }
}

fn default_inbound_capacity() -> usize {
    64
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_operation_timeout() -> u64 {
    15
}

fn default_room_reap_interval() -> u64 {
    60
}
