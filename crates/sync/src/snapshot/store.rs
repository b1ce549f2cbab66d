use crate::world::{Actor, Player, Sector};

use super::position::{PlayerPosition, SectorPosition};
use super::ring::IndexedRing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorSlot {
    pub position: SectorPosition,
    pub confirmed: bool,
}

/// Per-step history of the local player and of every sector, used for rollback.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    capacity: usize,
    player: IndexedRing<PlayerPosition>,
    sectors: Vec<IndexedRing<SectorSlot>>,
}

impl SnapshotStore {
    pub fn new(sector_count: usize, capacity: usize) -> Self {
        Self {
            capacity,
            player: IndexedRing::new(capacity),
            sectors: (0..sector_count).map(|_| IndexedRing::new(capacity)).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn save_player(&mut self, index: u32, player: &Player, actor: &Actor) {
        self.player
            .save(index, PlayerPosition::capture(index, player, actor));
    }

    pub fn player_at(&self, index: u32) -> Option<&PlayerPosition> {
        self.player.get(index)
    }

    /// Records a predicted sector state. Confirmed server values are never overwritten.
    pub fn save_sector(&mut self, index: u32, sector_number: usize, sector: &Sector) -> bool {
        let Some(ring) = self.sectors.get_mut(sector_number) else {
            return false;
        };
        if ring.get(index).is_some_and(|slot| slot.confirmed) {
            return false;
        }
        ring.save(
            index,
            SectorSlot {
                position: SectorPosition::capture(index, sector),
                confirmed: false,
            },
        );
        true
    }

    pub fn confirm_sector(
        &mut self,
        index: u32,
        sector_number: usize,
        position: SectorPosition,
    ) -> bool {
        let Some(ring) = self.sectors.get_mut(sector_number) else {
            return false;
        };
        ring.save(
            index,
            SectorSlot {
                position: position.restamped(index),
                confirmed: true,
            },
        );
        true
    }

    pub fn sector_at(&self, index: u32, sector_number: usize) -> Option<&SectorSlot> {
        self.sectors.get(sector_number)?.get(index)
    }

    /// Writes every sector's stored state at `index` back onto the live sectors.
    pub fn load_sectors(&self, index: u32, sectors: &mut [Sector]) -> usize {
        let mut loaded = 0;
        for (ring, sector) in self.sectors.iter().zip(sectors.iter_mut()) {
            if let Some(slot) = ring.get(index) {
                slot.position.apply(sector);
                loaded += 1;
            }
        }
        loaded
    }

    /// Makes sure every sector has a value at `index`, taken from the previous
    /// step when known and from the live sector otherwise.
    pub fn carry_sectors_forward(&mut self, index: u32, sectors: &[Sector]) -> usize {
        let mut filled = 0;
        for (ring, sector) in self.sectors.iter_mut().zip(sectors) {
            if ring.contains(index) {
                continue;
            }
            let previous = index.checked_sub(1).filter(|&p| ring.contains(p));
            match previous {
                Some(previous) => {
                    let Some(mut slot) = ring.get(previous).copied() else {
                        continue;
                    };
                    slot.position = slot.position.restamped(index);
                    slot.confirmed = false;
                    ring.save(index, slot);
                }
                None => ring.save(
                    index,
                    SectorSlot {
                        position: SectorPosition::capture(index, sector),
                        confirmed: false,
                    },
                ),
            }
            filled += 1;
        }
        filled
    }

    /// Puts a sector back the way it stood at `from` and overwrites the predicted
    /// slots after it, up to `through`.
    pub fn revert_sector(
        &mut self,
        sector_number: usize,
        from: u32,
        through: u32,
        sector: &mut Sector,
    ) -> bool {
        let capacity = self.capacity as u32;
        let Some(ring) = self.sectors.get_mut(sector_number) else {
            return false;
        };
        let Some(origin) = ring.get(from).map(|slot| slot.position) else {
            return false;
        };
        origin.apply(sector);
        let first = from
            .saturating_add(1)
            .max(through.saturating_sub(capacity.saturating_sub(1)));
        for index in first..=through {
            if ring.get(index).is_some_and(|slot| slot.confirmed) {
                continue;
            }
            ring.save(
                index,
                SectorSlot {
                    position: origin.restamped(index),
                    confirmed: false,
                },
            );
        }
        true
    }

    pub fn reset(&mut self, sector_count: usize) {
        self.player.clear();
        self.sectors = (0..sector_count)
            .map(|_| IndexedRing::new(self.capacity))
            .collect();
    }
}
