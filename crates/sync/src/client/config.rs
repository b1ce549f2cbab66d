use serde::{Deserialize, Serialize};

use crate::net::protocol::{MAX_COMMAND_BUNDLE_SIZE, MAX_LATENCY_SECS, TIC_RATE};

/// How many steps of server messages may queue up before the client catches up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PacketBufferSize {
    /// Catch up one step at a time whenever the backlog outgrows the round trip.
    #[default]
    Adaptive,
    /// No buffering: every message is applied the moment it arrives.
    Disabled,
    Fixed(u32),
}

impl PacketBufferSize {
    /// Maps the console value: 0 is adaptive, 1 disables buffering.
    pub fn from_raw(value: u32, max_positions: usize) -> Self {
        match value {
            0 => Self::Adaptive,
            1 => Self::Disabled,
            n => Self::Fixed(n.min((max_positions / 2) as u32)),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Adaptive => 0,
            Self::Disabled => 1,
            Self::Fixed(n) => n,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("tic rate must be between 1 and 1000, got {0}")]
    TicRate(u32),
    #[error("maximum latency must be at least one second, got {0}")]
    MaxLatency(u32),
    #[error("command bundle size must be between 2 and {max}, got {value}")]
    CommandBundleSize { value: usize, max: usize },
    #[error("fixed packet buffer size {value} exceeds {max}")]
    PacketBuffer { value: u32, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub tic_rate: u32,
    pub packet_buffer: PacketBufferSize,
    pub prediction: bool,
    pub predict_shots: bool,
    pub predict_sector_activation: bool,
    pub constant_prediction: bool,
    pub max_latency_secs: u32,
    pub command_bundle_size: usize,
    /// Steps left unconfirmed after a flush so the next frame still has work.
    pub catch_up_margin: u32,
    pub adaptive_slack_tics: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tic_rate: TIC_RATE,
            packet_buffer: PacketBufferSize::Adaptive,
            prediction: true,
            predict_shots: true,
            predict_sector_activation: true,
            constant_prediction: false,
            max_latency_secs: MAX_LATENCY_SECS,
            command_bundle_size: 10,
            catch_up_margin: 2,
            adaptive_slack_tics: 3,
        }
    }
}

impl SyncConfig {
    /// Capacity of every per-step ring.
    pub fn max_positions(&self) -> usize {
        (self.tic_rate * self.max_latency_secs) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.tic_rate) {
            return Err(ConfigError::TicRate(self.tic_rate));
        }
        if self.max_latency_secs == 0 {
            return Err(ConfigError::MaxLatency(self.max_latency_secs));
        }
        if !(2..=MAX_COMMAND_BUNDLE_SIZE).contains(&self.command_bundle_size) {
            return Err(ConfigError::CommandBundleSize {
                value: self.command_bundle_size,
                max: MAX_COMMAND_BUNDLE_SIZE,
            });
        }
        if let PacketBufferSize::Fixed(n) = self.packet_buffer {
            let max = (self.max_positions() / 2) as u32;
            if n > max {
                return Err(ConfigError::PacketBuffer { value: n, max });
            }
        }
        Ok(())
    }
}
