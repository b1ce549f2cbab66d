mod broadcast;

pub use broadcast::{SectorBroadcaster, thinker_status_messages};
