//! Fixed-layout message bodies. Every field is four bytes wide so the structs
//! have no padding and can be cast straight to and from the wire.

use bytemuck::{Pod, Zeroable};

use crate::simulation::{Buttons, Command};
use crate::snapshot::{ActorPosition, PlayerPosition, SectorPosition};

use super::protocol::ProtocolError;

pub const ACTIVATION_CROSS: u32 = 0;
pub const ACTIVATION_USE: u32 = 1;
pub const ACTIVATION_SHOOT: u32 = 2;
pub const ACTIVATION_TYPES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AuthLevel {
    None = 0,
    Spectator = 1,
    Player = 2,
    Moderator = 3,
    Administrator = 4,
}

impl AuthLevel {
    pub fn from_raw(value: i32) -> Result<Self, ProtocolError> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Spectator,
            2 => Self::Player,
            3 => Self::Moderator,
            4 => Self::Administrator,
            _ => {
                return Err(ProtocolError::InvalidValue {
                    field: "authorization level",
                    value: value as i64,
                });
            }
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct InitialState {
    pub player_number: u32,
    pub map_number: u32,
    pub rng_seed: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct CurrentState {
    pub gametic: u32,
    pub leveltime: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct SyncState {
    pub gametic: u32,
    pub leveltime: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MapStarted {
    pub map_number: u32,
    pub gametic: u32,
    pub leveltime: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MapCompleted {
    pub new_map_number: u32,
    pub enter_intermission: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct AuthResult {
    pub level: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ClientInit {
    pub client_number: u32,
    pub team: i32,
    pub spectating: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ClientStatus {
    pub client_number: u32,
    pub server_lag: u32,
    pub transit_lag: u32,
    pub packet_loss: u32,
    /// Index of the newest command from this client the server has run.
    pub last_command_run: u32,
    pub floor_status: i32,
    pub position: PlayerPosition,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PlayerSpawned {
    pub player_number: u32,
    pub net_id: u32,
    pub as_spectator: u32,
    pub position: [i32; 3],
    pub angle: u32,
    pub sector: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PlayerRemoved {
    pub player_number: u32,
    pub reason: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct CommandBundleHeader {
    pub client_number: u32,
    pub count: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct WireCommand {
    pub world_index: u32,
    pub forward_move: i32,
    pub side_move: i32,
    pub angle_turn: i32,
    pub look: i32,
    pub buttons: u32,
}

impl From<&Command> for WireCommand {
    fn from(command: &Command) -> Self {
        Self {
            world_index: command.world_index,
            forward_move: command.forward_move as i32,
            side_move: command.side_move as i32,
            angle_turn: command.angle_turn as i32,
            look: command.look as i32,
            buttons: command.buttons.bits(),
        }
    }
}

impl TryFrom<WireCommand> for Command {
    type Error = ProtocolError;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        fn narrow<T: TryFrom<i32>>(field: &'static str, value: i32) -> Result<T, ProtocolError> {
            T::try_from(value).map_err(|_| ProtocolError::InvalidValue {
                field,
                value: value as i64,
            })
        }

        Ok(Command {
            world_index: wire.world_index,
            forward_move: narrow("forward move", wire.forward_move)?,
            side_move: narrow("side move", wire.side_move)?,
            angle_turn: narrow("angle turn", wire.angle_turn)?,
            look: narrow("look", wire.look)?,
            buttons: Buttons::from_bits_truncate(wire.buttons),
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ServerMessageHeader {
    pub is_hud: u32,
    pub length: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PlayerMessageHeader {
    pub sender: u32,
    pub recipient_type: i32,
    pub recipient: u32,
    pub length: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct PuffSpawned {
    pub shooter_net_id: u32,
    pub position: [i32; 3],
    pub angle: u32,
    pub updown: i32,
    pub particles: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct BloodSpawned {
    pub shooter_net_id: u32,
    pub target_net_id: u32,
    pub position: [i32; 3],
    pub angle: u32,
    pub damage: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorSpawned {
    pub net_id: u32,
    pub position: [i32; 3],
    pub momentum: [i32; 3],
    pub angle: u32,
    pub flags: u32,
    pub kind: i32,
    pub sector: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorPositionUpdate {
    pub net_id: u32,
    pub position: ActorPosition,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorTarget {
    pub net_id: u32,
    pub target_net_id: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorState {
    pub net_id: u32,
    pub state: i32,
    pub kind: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorDamaged {
    pub target_net_id: u32,
    pub inflictor_net_id: u32,
    pub source_net_id: u32,
    pub health_damage: i32,
    pub armor_damage: i32,
    pub means_of_death: i32,
    pub fatal: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorKilled {
    pub target_net_id: u32,
    pub inflictor_net_id: u32,
    pub source_net_id: u32,
    pub damage: i32,
    pub means_of_death: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ActorRemoved {
    pub net_id: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LineActivated {
    pub activation: u32,
    pub actor_net_id: u32,
    pub position: [i32; 3],
    pub angle: u32,
    pub line: i32,
    pub side: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MonsterEvent {
    pub net_id: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MissileSpawned {
    pub net_id: u32,
    pub source_net_id: u32,
    pub kind: i32,
    pub position: [i32; 3],
    pub momentum: [i32; 3],
    pub angle: u32,
    pub sector: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct MissileExploded {
    pub net_id: u32,
    pub tics: u32,
}

/// Prefix of a thinker spawn. The kind's status struct follows it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ThinkerSpawnHeader {
    pub net_id: u32,
    pub command_index: u32,
    pub kind: u32,
    pub sector: u32,
    pub line: i32,
    pub sound_sequence: i32,
}

/// Prefix of a thinker status or removal. Status messages append the kind's struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct ThinkerHeader {
    pub net_id: u32,
    pub command_index: u32,
    pub kind: u32,
}

/// `position.world_index` is the command index the heights belong to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct SectorPositionUpdate {
    pub sector_number: u32,
    pub position: SectorPosition,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct AnnouncerEvent {
    pub event: u32,
    pub source_net_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn bodies_have_no_padding() {
        assert_eq!(size_of::<ClientStatus>(), 24 + size_of::<PlayerPosition>());
        assert_eq!(size_of::<ThinkerSpawnHeader>(), 24);
        assert_eq!(size_of::<SectorPositionUpdate>(), 16);
        assert_eq!(size_of::<WireCommand>(), 24);
    }

    #[test]
    fn oversized_command_fields_are_rejected() {
        let wire = WireCommand {
            world_index: 3,
            forward_move: 400,
            ..Default::default()
        };
        assert_eq!(
            Command::try_from(wire),
            Err(ProtocolError::InvalidValue {
                field: "forward move",
                value: 400
            })
        );
    }

    #[test]
    fn auth_levels() {
        assert_eq!(AuthLevel::from_raw(0), Ok(AuthLevel::None));
        assert_eq!(AuthLevel::from_raw(4), Ok(AuthLevel::Administrator));
        assert!(AuthLevel::from_raw(5).is_err());
    }
}
