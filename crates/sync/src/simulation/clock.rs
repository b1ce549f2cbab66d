use std::time::Duration;

/// Converts real frame time into whole simulation steps.
#[derive(Debug, Clone)]
pub struct TicClock {
    tic_rate: u32,
    tic: Duration,
    accumulator: Duration,
}

impl TicClock {
    const MAX_FRAME: Duration = Duration::from_millis(250);

    pub fn new(tic_rate: u32) -> Self {
        let tic_rate = tic_rate.max(1);
        Self {
            tic_rate,
            tic: Duration::from_secs(1) / tic_rate,
            accumulator: Duration::ZERO,
        }
    }

    pub fn tic_rate(&self) -> u32 {
        self.tic_rate
    }

    pub fn tic_duration(&self) -> Duration {
        self.tic
    }

    pub fn accumulate(&mut self, delta: Duration) {
        self.accumulator += delta.min(Self::MAX_FRAME);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.tic
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.tic {
            self.accumulator -= self.tic;
            true
        } else {
            false
        }
    }

    pub fn time_to_next_tic(&self) -> Duration {
        self.tic.saturating_sub(self.accumulator)
    }

    pub fn tics_in(&self, duration: Duration) -> u32 {
        (duration.as_nanos() / self.tic.as_nanos().max(1)) as u32
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }
}
