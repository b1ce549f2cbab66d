use ticsync::PacketLossSimulation;

#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    pub tic_rate: u32,
    pub map_number: u32,
    pub rng_seed: u64,
    /// Sector the scripted player opens with the use key.
    pub door_sector: usize,
    pub door_height: i32,
    pub packet_loss: PacketLossSimulation,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            tic_rate: ticsync::net::TIC_RATE,
            map_number: 1,
            rng_seed: 0x5eed,
            door_sector: 1,
            door_height: 64,
            packet_loss: PacketLossSimulation::default(),
        }
    }
}
