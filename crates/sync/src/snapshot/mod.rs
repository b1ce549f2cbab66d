mod position;
mod ring;
mod store;

pub use position::{ActorPosition, PlayerPosition, SectorPosition};
pub use ring::IndexedRing;
pub use store::{SectorSlot, SnapshotStore};
