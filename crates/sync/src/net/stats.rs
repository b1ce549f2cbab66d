use rand::Rng;
use serde::{Deserialize, Serialize};

/// Artificial loss and latency applied by the in-memory link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    /// Fraction of unreliable packets dropped, 0.0 to 1.0.
    pub loss_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
}

impl PacketLossSimulation {
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rng.gen_bool(self.loss_percent.clamp(0.0, 1.0) as f64)
    }

    pub fn delay_ms<R: Rng>(&self, rng: &mut R) -> u32 {
        if !self.enabled || self.max_latency_ms == 0 {
            return 0;
        }
        let base = self.min_latency_ms.min(self.max_latency_ms);
        let spread = rng.gen_range(base..=self.max_latency_ms);
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        spread + jitter
    }

    /// Expected one-way delay, ignoring jitter.
    pub fn mean_latency_ms(&self) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        (self.min_latency_ms.min(self.max_latency_ms) + self.max_latency_ms) as f32 / 2.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_lost: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub rtt_ms: f32,
    pub packet_loss_percent: f32,
}

impl LinkStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
        self.refresh_loss();
    }

    pub fn record_lost(&mut self) {
        self.packets_lost += 1;
        self.refresh_loss();
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.packets_received += 1;
        self.bytes_received += bytes as u64;
    }

    fn refresh_loss(&mut self) {
        if self.packets_sent > 0 {
            self.packet_loss_percent =
                self.packets_lost as f32 * 100.0 / self.packets_sent as f32;
        }
    }
}
