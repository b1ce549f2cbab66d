mod ceiling;
mod door;
mod elevator;
mod floor;
mod pillar;
mod plane;
mod platform;
mod waggle;

pub use ceiling::{CEILING_SPEED, CeilingStatus, CeilingType};
pub use door::{DOOR_SPEED, DOOR_WAIT, DoorStatus, DoorType};
pub use elevator::{ELEVATOR_SPEED, ElevatorStatus};
pub use floor::{FLOOR_SPEED, FloorStatus, NO_TEXTURE_CHANGE};
pub use pillar::PillarStatus;
pub use plane::{Plane, PlaneResult, move_plane};
pub use platform::{PLAT_SPEED, PLAT_WAIT, PlatState, PlatType, PlatformStatus};
pub use waggle::{FloorWaggleStatus, WaggleState};

use crate::effects::{Effects, SimulationMode, Sound};
use crate::netid::{NetId, NetIdentified};
use crate::snapshot::IndexedRing;
use crate::world::Sector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ThinkerKind {
    Platform = 0,
    Door = 1,
    Ceiling = 2,
    Floor = 3,
    Elevator = 4,
    Pillar = 5,
    FloorWaggle = 6,
}

impl ThinkerKind {
    pub const ALL: [ThinkerKind; 7] = [
        ThinkerKind::Platform,
        ThinkerKind::Door,
        ThinkerKind::Ceiling,
        ThinkerKind::Floor,
        ThinkerKind::Elevator,
        ThinkerKind::Pillar,
        ThinkerKind::FloorWaggle,
    ];

    pub fn from_raw(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ThinkerKind::Platform => "platform",
            ThinkerKind::Door => "door",
            ThinkerKind::Ceiling => "ceiling",
            ThinkerKind::Floor => "floor",
            ThinkerKind::Elevator => "elevator",
            ThinkerKind::Pillar => "pillar",
            ThinkerKind::FloorWaggle => "floor waggle",
        }
    }
}

/// The synchronized state of one sector thinker, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkerStatus {
    Platform(PlatformStatus),
    Door(DoorStatus),
    Ceiling(CeilingStatus),
    Floor(FloorStatus),
    Elevator(ElevatorStatus),
    Pillar(PillarStatus),
    FloorWaggle(FloorWaggleStatus),
}

impl ThinkerStatus {
    pub fn kind(&self) -> ThinkerKind {
        match self {
            ThinkerStatus::Platform(_) => ThinkerKind::Platform,
            ThinkerStatus::Door(_) => ThinkerKind::Door,
            ThinkerStatus::Ceiling(_) => ThinkerKind::Ceiling,
            ThinkerStatus::Floor(_) => ThinkerKind::Floor,
            ThinkerStatus::Elevator(_) => ThinkerKind::Elevator,
            ThinkerStatus::Pillar(_) => ThinkerKind::Pillar,
            ThinkerStatus::FloorWaggle(_) => ThinkerKind::FloorWaggle,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            ThinkerStatus::Platform(s) => bytemuck::bytes_of(s),
            ThinkerStatus::Door(s) => bytemuck::bytes_of(s),
            ThinkerStatus::Ceiling(s) => bytemuck::bytes_of(s),
            ThinkerStatus::Floor(s) => bytemuck::bytes_of(s),
            ThinkerStatus::Elevator(s) => bytemuck::bytes_of(s),
            ThinkerStatus::Pillar(s) => bytemuck::bytes_of(s),
            ThinkerStatus::FloorWaggle(s) => bytemuck::bytes_of(s),
        }
    }

    pub fn size_for(kind: ThinkerKind) -> usize {
        use std::mem::size_of;
        match kind {
            ThinkerKind::Platform => size_of::<PlatformStatus>(),
            ThinkerKind::Door => size_of::<DoorStatus>(),
            ThinkerKind::Ceiling => size_of::<CeilingStatus>(),
            ThinkerKind::Floor => size_of::<FloorStatus>(),
            ThinkerKind::Elevator => size_of::<ElevatorStatus>(),
            ThinkerKind::Pillar => size_of::<PillarStatus>(),
            ThinkerKind::FloorWaggle => size_of::<FloorWaggleStatus>(),
        }
    }

    /// Reads a status of `kind` from the front of `bytes`. `None` if too short.
    pub fn read(kind: ThinkerKind, bytes: &[u8]) -> Option<Self> {
        let body = bytes.get(..Self::size_for(kind))?;
        let status = match kind {
            ThinkerKind::Platform => ThinkerStatus::Platform(read_pod(body)?),
            ThinkerKind::Door => ThinkerStatus::Door(read_pod(body)?),
            ThinkerKind::Ceiling => ThinkerStatus::Ceiling(read_pod(body)?),
            ThinkerKind::Floor => ThinkerStatus::Floor(read_pod(body)?),
            ThinkerKind::Elevator => ThinkerStatus::Elevator(read_pod(body)?),
            ThinkerKind::Pillar => ThinkerStatus::Pillar(read_pod(body)?),
            ThinkerKind::FloorWaggle => ThinkerStatus::FloorWaggle(read_pod(body)?),
        };
        Some(status)
    }
}

fn read_pod<T: bytemuck::Pod>(bytes: &[u8]) -> Option<T> {
    bytemuck::try_pod_read_unaligned(bytes).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkOutcome {
    Continue,
    Finished,
}

/// What a thinker may touch besides its own status and sector.
pub struct ThinkContext<'a> {
    pub sector: usize,
    pub sound_sequence: i32,
    pub mode: SimulationMode,
    pub effects: &'a mut Effects,
}

impl ThinkContext<'_> {
    pub fn sound(&mut self, sound: Sound) {
        self.effects.sector_sound(self.mode, self.sector, sound);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThinkerError {
    #[error("{actual:?} status sent for a {expected:?} thinker")]
    KindMismatch {
        expected: ThinkerKind,
        actual: ThinkerKind,
    },
}

/// The command index at which a thinker stopped, and whether the server said so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub index: u32,
    pub authoritative: bool,
}

/// The newest point the server has reported on: its command index and the world
/// index of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationCutoff {
    pub command_index: u32,
    pub world_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatusSlot {
    status: ThinkerStatus,
    confirmed: bool,
}

/// A door, lift or other moving plane, with the history needed to rewind it.
#[derive(Debug, Clone)]
pub struct SectorThinker {
    net_id: NetId,
    pub sector: usize,
    pub sound_sequence: i32,
    /// Command index the thinker was created at. It first thinks on the step after.
    pub spawned_at: u32,
    /// Set while the thinker exists only because the local player triggered it.
    pub predicted_at: Option<u32>,
    status: ThinkerStatus,
    spawn_status: ThinkerStatus,
    removal: Option<Removal>,
    history: IndexedRing<StatusSlot>,
}

impl SectorThinker {
    pub fn from_server(
        sector: usize,
        status: ThinkerStatus,
        sound_sequence: i32,
        command_index: u32,
        history: usize,
    ) -> Self {
        let mut ring = IndexedRing::new(history);
        ring.save(
            command_index,
            StatusSlot {
                status,
                confirmed: true,
            },
        );
        Self {
            net_id: NetId::NONE,
            sector,
            sound_sequence,
            spawned_at: command_index,
            predicted_at: None,
            status,
            spawn_status: status,
            removal: None,
            history: ring,
        }
    }

    pub fn predicted(
        sector: usize,
        status: ThinkerStatus,
        sound_sequence: i32,
        command_index: u32,
        history: usize,
    ) -> Self {
        let mut thinker = Self::from_server(sector, status, sound_sequence, command_index, history);
        thinker.predicted_at = Some(command_index);
        thinker.history.save(
            command_index,
            StatusSlot {
                status,
                confirmed: false,
            },
        );
        thinker
    }

    pub fn kind(&self) -> ThinkerKind {
        self.status.kind()
    }

    pub fn status(&self) -> &ThinkerStatus {
        &self.status
    }

    pub fn removal(&self) -> Option<Removal> {
        self.removal
    }

    pub fn is_predicted(&self) -> bool {
        self.predicted_at.is_some()
    }

    fn check_kind(&self, status: &ThinkerStatus) -> Result<(), ThinkerError> {
        if status.kind() != self.kind() {
            return Err(ThinkerError::KindMismatch {
                expected: self.kind(),
                actual: status.kind(),
            });
        }
        Ok(())
    }

    /// Overwrites the live status, used when nothing is being predicted.
    pub fn apply_status(&mut self, status: ThinkerStatus) -> Result<(), ThinkerError> {
        self.check_kind(&status)?;
        self.status = status;
        Ok(())
    }

    /// Stores a server status at `index`. Later predicted writes never replace it.
    pub fn confirm_status(&mut self, index: u32, status: ThinkerStatus) -> Result<(), ThinkerError> {
        self.check_kind(&status)?;
        self.history.save(
            index,
            StatusSlot {
                status,
                confirmed: true,
            },
        );
        // the server still runs it, so a local finish before this point was wrong
        if let Some(removal) = self.removal {
            if !removal.authoritative && removal.index < index {
                self.removal = None;
            }
        }
        Ok(())
    }

    pub fn status_at(&self, index: u32) -> Option<&ThinkerStatus> {
        self.history.get(index).map(|slot| &slot.status)
    }

    pub fn is_confirmed_at(&self, index: u32) -> bool {
        self.history.get(index).is_some_and(|slot| slot.confirmed)
    }

    pub fn is_active_at(&self, index: u32) -> bool {
        index > self.spawned_at && self.removal.is_none_or(|removal| index <= removal.index)
    }

    /// Runs one step of the kind's logic against `sector`.
    pub fn think(
        &mut self,
        index: u32,
        sector: &mut Sector,
        mode: SimulationMode,
        effects: &mut Effects,
    ) -> ThinkOutcome {
        let mut cx = ThinkContext {
            sector: self.sector,
            sound_sequence: self.sound_sequence,
            mode,
            effects,
        };
        let outcome = match &mut self.status {
            ThinkerStatus::Platform(s) => platform::think(s, sector, &mut cx),
            ThinkerStatus::Door(s) => door::think(s, sector, &mut cx),
            ThinkerStatus::Ceiling(s) => ceiling::think(s, sector, &mut cx),
            ThinkerStatus::Floor(s) => floor::think(s, sector, &mut cx),
            ThinkerStatus::Elevator(s) => elevator::think(s, sector, &mut cx),
            ThinkerStatus::Pillar(s) => pillar::think(s, sector, &mut cx),
            ThinkerStatus::FloorWaggle(s) => waggle::think(s, sector, &mut cx),
        };
        if outcome == ThinkOutcome::Finished {
            self.mark_removed(index, false);
        }
        outcome
    }

    /// Advances the newest step and records the result.
    pub fn predict(&mut self, index: u32, sector: &mut Sector, effects: &mut Effects) -> ThinkOutcome {
        let outcome = self.think(index, sector, SimulationMode::Live, effects);
        self.save_status(index);
        outcome
    }

    /// Advances a step that has already been shown once.
    pub fn re_predict(
        &mut self,
        index: u32,
        sector: &mut Sector,
        effects: &mut Effects,
    ) -> ThinkOutcome {
        let outcome = self.think(index, sector, SimulationMode::Replaying, effects);
        self.save_status(index);
        outcome
    }

    /// Records the live status at `index`, or snaps to the server's if it has one.
    pub fn save_status(&mut self, index: u32) {
        if let Some(slot) = self.history.get(index).filter(|slot| slot.confirmed) {
            self.status = slot.status;
            return;
        }
        self.history.save(
            index,
            StatusSlot {
                status: self.status,
                confirmed: false,
            },
        );
    }

    /// Restores the state as of `index` and forgets local conclusions drawn after it.
    pub fn rewind(&mut self, index: u32) {
        if let Some(removal) = self.removal {
            if !removal.authoritative && removal.index > index {
                self.removal = None;
            }
        }
        self.status = match self.history.latest_at_or_before(index) {
            Some((at, slot)) if at >= self.spawned_at => slot.status,
            _ => self.spawn_status,
        };
    }

    pub fn mark_removed(&mut self, index: u32, authoritative: bool) {
        match self.removal {
            Some(removal) if removal.authoritative && !authoritative => {}
            _ => self.removal = Some(Removal { index, authoritative }),
        }
    }

    /// A predicted activation the server has had the chance to confirm and did not.
    pub fn expired(&self, cutoff: ActivationCutoff, current: u32) -> bool {
        self.predicted_at
            .is_some_and(|at| cutoff.command_index >= at && cutoff.world_index <= current)
    }

    /// True once the confirmed command index has passed the removal.
    pub fn collectable(&self, confirmed_index: u32) -> bool {
        self.removal.is_some_and(|removal| removal.index <= confirmed_index)
    }

    /// Promotes a predicted thinker to a server-owned one.
    pub fn confirm(&mut self, command_index: u32, status: ThinkerStatus) {
        self.predicted_at = None;
        self.spawned_at = self.spawned_at.min(command_index);
        self.spawn_status = status;
        self.status = status;
        self.history.save(
            command_index,
            StatusSlot {
                status,
                confirmed: true,
            },
        );
    }
}

impl NetIdentified for SectorThinker {
    fn net_id(&self) -> NetId {
        self.net_id
    }

    fn set_net_id(&mut self, id: NetId) {
        self.net_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{FRACUNIT, from_int};

    fn closed_door_sector() -> Sector {
        Sector::new(0, 0)
    }

    fn door(at: u32) -> SectorThinker {
        let status = ThinkerStatus::Door(DoorStatus::raise(from_int(64)));
        SectorThinker::from_server(3, status, 0, at, 64)
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in ThinkerKind::ALL {
            assert_eq!(ThinkerKind::from_raw(kind as u32), Some(kind));
        }
        assert_eq!(ThinkerKind::from_raw(7), None);
    }

    #[test]
    fn status_reads_back_from_bytes() {
        let status = ThinkerStatus::Platform(PlatformStatus::down_wait_up_stay(0, from_int(64)));
        let bytes = status.bytes().to_vec();
        assert_eq!(bytes.len(), ThinkerStatus::size_for(ThinkerKind::Platform));
        assert_eq!(ThinkerStatus::read(ThinkerKind::Platform, &bytes), Some(status));
        assert_eq!(ThinkerStatus::read(ThinkerKind::Platform, &bytes[..8]), None);
    }

    #[test]
    fn door_opens_with_one_sound() {
        let mut sector = closed_door_sector();
        let mut effects = Effects::new();
        let mut thinker = door(10);

        thinker.predict(11, &mut sector, &mut effects);
        assert_eq!(sector.ceiling_height, 2 * FRACUNIT);
        thinker.re_predict(12, &mut sector, &mut effects);
        assert_eq!(sector.ceiling_height, 4 * FRACUNIT);
        assert_eq!(effects.pending(), 0);
    }

    #[test]
    fn activity_window_follows_spawn_and_removal() {
        let mut thinker = door(10);
        assert!(!thinker.is_active_at(10));
        assert!(thinker.is_active_at(11));
        thinker.mark_removed(20, false);
        assert!(thinker.is_active_at(20));
        assert!(!thinker.is_active_at(21));
        assert!(thinker.collectable(20));
        assert!(!thinker.collectable(19));
    }

    #[test]
    fn rewind_undoes_local_finish() {
        let mut sector = closed_door_sector();
        let mut effects = Effects::new();
        let mut thinker = door(0);
        for i in 1..=5 {
            thinker.predict(i, &mut sector, &mut effects);
        }
        let at_three = *thinker.status_at(3).unwrap();
        thinker.mark_removed(5, false);

        thinker.rewind(3);
        assert_eq!(thinker.removal(), None);
        assert_eq!(thinker.status(), &at_three);

        thinker.mark_removed(4, true);
        thinker.rewind(2);
        assert_eq!(thinker.removal().map(|r| r.index), Some(4));
    }

    #[test]
    fn confirmed_status_is_sticky() {
        let mut sector = closed_door_sector();
        let mut effects = Effects::new();
        let mut thinker = door(0);
        let mut server = DoorStatus::raise(from_int(64));
        server.direction = 0;
        server.top_countdown = 99;
        thinker.confirm_status(1, ThinkerStatus::Door(server)).unwrap();

        thinker.predict(1, &mut sector, &mut effects);
        assert!(thinker.is_confirmed_at(1));
        assert_eq!(thinker.status(), &ThinkerStatus::Door(server));
    }

    #[test]
    fn mismatched_status_is_rejected() {
        let mut thinker = door(0);
        let status = ThinkerStatus::Pillar(PillarStatus::default());
        let err = thinker.apply_status(status).unwrap_err();
        assert_eq!(
            err,
            ThinkerError::KindMismatch {
                expected: ThinkerKind::Door,
                actual: ThinkerKind::Pillar,
            }
        );
    }

    #[test]
    fn predicted_activation_expires_after_cutoff() {
        let status = ThinkerStatus::Door(DoorStatus::raise(from_int(64)));
        let thinker = SectorThinker::predicted(1, status, 0, 50, 64);
        let early = ActivationCutoff {
            command_index: 49,
            world_index: 60,
        };
        let late = ActivationCutoff {
            command_index: 50,
            world_index: 60,
        };
        assert!(!thinker.expired(early, 60));
        assert!(!thinker.expired(late, 59));
        assert!(thinker.expired(late, 60));
        assert!(!door(50).expired(late, 60));
    }
}
