use crate::net::wire::AuthLevel;
use crate::thinker::ActivationCutoff;

/// Every counter and flag the client keeps about where it stands relative to the server.
#[derive(Debug, Clone)]
pub struct ClientSyncContext {
    /// The step the client has simulated up to.
    pub current_world_index: u32,
    /// The newest step the server has finished.
    pub latest_world_index: u32,
    pub synced: bool,
    pub in_level: bool,
    pub flush_requested: bool,
    pub demo_playback: bool,
    pub console_active: bool,
    pub console_player: usize,
    pub display_player: usize,
    pub map_number: u32,
    pub rng_seed: u32,
    pub auth_level: AuthLevel,
    pub activation_cutoff: ActivationCutoff,
}

impl Default for ClientSyncContext {
    fn default() -> Self {
        Self {
            current_world_index: 0,
            latest_world_index: 0,
            synced: false,
            in_level: false,
            flush_requested: false,
            demo_playback: false,
            console_active: false,
            console_player: 0,
            display_player: 0,
            map_number: 0,
            rng_seed: 0,
            auth_level: AuthLevel::None,
            activation_cutoff: ActivationCutoff::default(),
        }
    }
}

impl ClientSyncContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps the server has finished that the client has not yet run.
    pub fn backlog(&self) -> u32 {
        self.latest_world_index
            .saturating_sub(self.current_world_index)
    }

    /// Puts both indices at `index` and marks the client synchronized.
    pub fn sync_to(&mut self, index: u32) {
        self.current_world_index = index;
        self.latest_world_index = index;
        self.synced = true;
        self.activation_cutoff = ActivationCutoff::default();
    }

    pub fn leave_level(&mut self) {
        self.in_level = false;
        self.synced = false;
        self.flush_requested = false;
    }
}
