use bytemuck::{Pod, Zeroable};

pub const TIC_RATE: u32 = 35;
pub const MAX_LATENCY_SECS: u32 = 10;
pub const MAX_POSITIONS: usize = (TIC_RATE * MAX_LATENCY_SECS) as usize;
pub const CL_MAX_BUFFER_SIZE: usize = MAX_POSITIONS;
pub const MAX_STRING_SIZE: usize = 255;
pub const MAX_CLIENTS: usize = 16;
pub const MAX_COMMAND_BUNDLE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageType {
    InitialState = 0,
    CurrentState = 1,
    Sync = 2,
    MapStarted = 3,
    MapCompleted = 4,
    AuthResult = 5,
    ClientInit = 6,
    PlayerCommand = 7,
    ClientStatus = 8,
    PlayerSpawned = 9,
    PlayerRemoved = 10,
    ServerMessage = 11,
    PlayerMessage = 12,
    PuffSpawned = 13,
    BloodSpawned = 14,
    ActorSpawned = 15,
    ActorPosition = 16,
    ActorTarget = 17,
    ActorState = 18,
    ActorDamaged = 19,
    ActorKilled = 20,
    ActorRemoved = 21,
    LineActivated = 22,
    MonsterActive = 23,
    MonsterAwakened = 24,
    MissileSpawned = 25,
    MissileExploded = 26,
    ThinkerSpawned = 27,
    ThinkerStatus = 28,
    ThinkerRemoved = 29,
    SectorPosition = 30,
    AnnouncerEvent = 31,
    TicFinished = 32,
}

impl MessageType {
    const ALL: [MessageType; 33] = [
        MessageType::InitialState,
        MessageType::CurrentState,
        MessageType::Sync,
        MessageType::MapStarted,
        MessageType::MapCompleted,
        MessageType::AuthResult,
        MessageType::ClientInit,
        MessageType::PlayerCommand,
        MessageType::ClientStatus,
        MessageType::PlayerSpawned,
        MessageType::PlayerRemoved,
        MessageType::ServerMessage,
        MessageType::PlayerMessage,
        MessageType::PuffSpawned,
        MessageType::BloodSpawned,
        MessageType::ActorSpawned,
        MessageType::ActorPosition,
        MessageType::ActorTarget,
        MessageType::ActorState,
        MessageType::ActorDamaged,
        MessageType::ActorKilled,
        MessageType::ActorRemoved,
        MessageType::LineActivated,
        MessageType::MonsterActive,
        MessageType::MonsterAwakened,
        MessageType::MissileSpawned,
        MessageType::MissileExploded,
        MessageType::ThinkerSpawned,
        MessageType::ThinkerStatus,
        MessageType::ThinkerRemoved,
        MessageType::SectorPosition,
        MessageType::AnnouncerEvent,
        MessageType::TicFinished,
    ];

    pub fn from_tag(tag: i32) -> Result<Self, ProtocolError> {
        usize::try_from(tag)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or(ProtocolError::UnknownType(tag))
    }

    /// Connection setup messages, applied as soon as they arrive.
    pub fn is_handshake(self) -> bool {
        matches!(
            self,
            MessageType::InitialState
                | MessageType::CurrentState
                | MessageType::Sync
                | MessageType::MapStarted
                | MessageType::MapCompleted
                | MessageType::AuthResult
        )
    }

    /// Messages held in their own buffers so rollback can see them as a group.
    pub fn is_side_buffered(self) -> bool {
        matches!(self, MessageType::SectorPosition | MessageType::ThinkerStatus)
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::InitialState => "initial state",
            MessageType::CurrentState => "current state",
            MessageType::Sync => "sync",
            MessageType::MapStarted => "map started",
            MessageType::MapCompleted => "map completed",
            MessageType::AuthResult => "auth result",
            MessageType::ClientInit => "client init",
            MessageType::PlayerCommand => "player command",
            MessageType::ClientStatus => "client status",
            MessageType::PlayerSpawned => "player spawned",
            MessageType::PlayerRemoved => "player removed",
            MessageType::ServerMessage => "server message",
            MessageType::PlayerMessage => "player message",
            MessageType::PuffSpawned => "puff spawned",
            MessageType::BloodSpawned => "blood spawned",
            MessageType::ActorSpawned => "actor spawned",
            MessageType::ActorPosition => "actor position",
            MessageType::ActorTarget => "actor target",
            MessageType::ActorState => "actor state",
            MessageType::ActorDamaged => "actor damaged",
            MessageType::ActorKilled => "actor killed",
            MessageType::ActorRemoved => "actor removed",
            MessageType::LineActivated => "line activated",
            MessageType::MonsterActive => "monster active",
            MessageType::MonsterAwakened => "monster awakened",
            MessageType::MissileSpawned => "missile spawned",
            MessageType::MissileExploded => "missile exploded",
            MessageType::ThinkerSpawned => "sector thinker spawned",
            MessageType::ThinkerStatus => "sector thinker status",
            MessageType::ThinkerRemoved => "sector thinker removed",
            MessageType::SectorPosition => "sector position",
            MessageType::AnnouncerEvent => "announcer event",
            MessageType::TicFinished => "tic finished",
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct MessageHeader {
    pub message_type: i32,
    pub world_index: u32,
}

pub const HEADER_SIZE: usize = std::mem::size_of::<MessageHeader>();

impl MessageHeader {
    pub fn new(message_type: MessageType, world_index: u32) -> Self {
        Self {
            message_type: message_type as i32,
            world_index,
        }
    }
}

/// Reads the tag and world index without looking at the body.
pub fn peek_header(bytes: &[u8]) -> Result<(MessageType, u32), ProtocolError> {
    let header = bytes
        .get(..HEADER_SIZE)
        .ok_or(ProtocolError::Truncated {
            needed: HEADER_SIZE,
            actual: bytes.len(),
        })?;
    let header: MessageHeader = bytemuck::pod_read_unaligned(header);
    Ok((MessageType::from_tag(header.message_type)?, header.world_index))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("message truncated: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("unknown message type {0}")]
    UnknownType(i32),
    #[error("declared string length {declared} exceeds {max}")]
    StringTooLong { declared: u32, max: usize },
    #[error("string is not valid UTF-8")]
    InvalidString,
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
}
