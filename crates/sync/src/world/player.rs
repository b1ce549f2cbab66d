use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed, from_int};
use crate::netid::NetId;

pub const VIEW_HEIGHT: Fixed = from_int(41);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(i32)]
pub enum PlayerState {
    #[default]
    Live = 0,
    Dead = 1,
    Reborn = 2,
}

impl From<i32> for PlayerState {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Dead,
            2 => Self::Reborn,
            _ => Self::Live,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub in_game: bool,
    pub actor: Option<NetId>,
    pub pitch: i32,
    pub bob: Fixed,
    pub view_z: Fixed,
    pub view_height: Fixed,
    pub delta_view_height: Fixed,
    pub jump_time: i32,
    pub state: PlayerState,
    pub health: i32,
    pub damage_count: i32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            in_game: false,
            actor: None,
            pitch: 0,
            bob: 0,
            view_z: 0,
            view_height: VIEW_HEIGHT,
            delta_view_height: 0,
            jump_time: 0,
            state: PlayerState::Live,
            health: 100,
            damage_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub team: i32,
    pub spectating: bool,
    pub server_lag: u32,
    pub transit_lag: u32,
    pub packet_loss: u32,
    pub floor_status: i32,
}
