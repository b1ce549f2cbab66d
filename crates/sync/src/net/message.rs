use std::mem::size_of;

use bytemuck::Pod;

use crate::netid::NetId;
use crate::simulation::Command;
use crate::thinker::{ThinkerKind, ThinkerStatus};

use super::protocol::{
    MAX_CLIENTS, MAX_COMMAND_BUNDLE_SIZE, MAX_STRING_SIZE, MessageHeader, MessageType,
    ProtocolError,
};
use super::wire::{self, ACTIVATION_TYPES, AuthLevel};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    InitialState(wire::InitialState),
    CurrentState(wire::CurrentState),
    Sync(wire::SyncState),
    MapStarted(wire::MapStarted),
    MapCompleted(wire::MapCompleted),
    AuthResult(AuthLevel),
    ClientInit(wire::ClientInit),
    PlayerCommand {
        client_number: u32,
        commands: Vec<Command>,
    },
    ClientStatus(wire::ClientStatus),
    PlayerSpawned(wire::PlayerSpawned),
    PlayerRemoved(wire::PlayerRemoved),
    ServerMessage {
        hud: bool,
        text: String,
    },
    PlayerMessage {
        sender: u32,
        recipient_type: i32,
        recipient: u32,
        text: String,
    },
    PuffSpawned(wire::PuffSpawned),
    BloodSpawned(wire::BloodSpawned),
    ActorSpawned(wire::ActorSpawned),
    ActorPosition(wire::ActorPositionUpdate),
    ActorTarget(wire::ActorTarget),
    ActorState(wire::ActorState),
    ActorDamaged(wire::ActorDamaged),
    ActorKilled(wire::ActorKilled),
    ActorRemoved(wire::ActorRemoved),
    LineActivated(wire::LineActivated),
    MonsterActive(wire::MonsterEvent),
    MonsterAwakened(wire::MonsterEvent),
    MissileSpawned(wire::MissileSpawned),
    MissileExploded(wire::MissileExploded),
    ThinkerSpawned {
        header: wire::ThinkerSpawnHeader,
        status: ThinkerStatus,
    },
    ThinkerStatus {
        net_id: NetId,
        command_index: u32,
        status: ThinkerStatus,
    },
    ThinkerRemoved {
        net_id: NetId,
        command_index: u32,
        kind: ThinkerKind,
    },
    SectorPosition(wire::SectorPositionUpdate),
    AnnouncerEvent(wire::AnnouncerEvent),
    TicFinished,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::InitialState(_) => MessageType::InitialState,
            Message::CurrentState(_) => MessageType::CurrentState,
            Message::Sync(_) => MessageType::Sync,
            Message::MapStarted(_) => MessageType::MapStarted,
            Message::MapCompleted(_) => MessageType::MapCompleted,
            Message::AuthResult(_) => MessageType::AuthResult,
            Message::ClientInit(_) => MessageType::ClientInit,
            Message::PlayerCommand { .. } => MessageType::PlayerCommand,
            Message::ClientStatus(_) => MessageType::ClientStatus,
            Message::PlayerSpawned(_) => MessageType::PlayerSpawned,
            Message::PlayerRemoved(_) => MessageType::PlayerRemoved,
            Message::ServerMessage { .. } => MessageType::ServerMessage,
            Message::PlayerMessage { .. } => MessageType::PlayerMessage,
            Message::PuffSpawned(_) => MessageType::PuffSpawned,
            Message::BloodSpawned(_) => MessageType::BloodSpawned,
            Message::ActorSpawned(_) => MessageType::ActorSpawned,
            Message::ActorPosition(_) => MessageType::ActorPosition,
            Message::ActorTarget(_) => MessageType::ActorTarget,
            Message::ActorState(_) => MessageType::ActorState,
            Message::ActorDamaged(_) => MessageType::ActorDamaged,
            Message::ActorKilled(_) => MessageType::ActorKilled,
            Message::ActorRemoved(_) => MessageType::ActorRemoved,
            Message::LineActivated(_) => MessageType::LineActivated,
            Message::MonsterActive(_) => MessageType::MonsterActive,
            Message::MonsterAwakened(_) => MessageType::MonsterAwakened,
            Message::MissileSpawned(_) => MessageType::MissileSpawned,
            Message::MissileExploded(_) => MessageType::MissileExploded,
            Message::ThinkerSpawned { .. } => MessageType::ThinkerSpawned,
            Message::ThinkerStatus { .. } => MessageType::ThinkerStatus,
            Message::ThinkerRemoved { .. } => MessageType::ThinkerRemoved,
            Message::SectorPosition(_) => MessageType::SectorPosition,
            Message::AnnouncerEvent(_) => MessageType::AnnouncerEvent,
            Message::TicFinished => MessageType::TicFinished,
        }
    }
}

/// A message together with the world index it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct NetMessage {
    pub world_index: u32,
    pub message: Message,
}

impl NetMessage {
    pub fn new(world_index: u32, message: Message) -> Self {
        Self {
            world_index,
            message,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Writer::default();
        out.pod(&MessageHeader::new(self.message_type(), self.world_index));

        match &self.message {
            Message::InitialState(body) => out.pod(body),
            Message::CurrentState(body) => out.pod(body),
            Message::Sync(body) => out.pod(body),
            Message::MapStarted(body) => out.pod(body),
            Message::MapCompleted(body) => out.pod(body),
            Message::AuthResult(level) => out.pod(&wire::AuthResult {
                level: *level as i32,
            }),
            Message::ClientInit(body) => out.pod(body),
            Message::PlayerCommand {
                client_number,
                commands,
            } => {
                let commands = &commands[..commands.len().min(MAX_COMMAND_BUNDLE_SIZE)];
                out.pod(&wire::CommandBundleHeader {
                    client_number: *client_number,
                    count: commands.len() as u32,
                });
                for command in commands {
                    out.pod(&wire::WireCommand::from(command));
                }
            }
            Message::ClientStatus(body) => out.pod(body),
            Message::PlayerSpawned(body) => out.pod(body),
            Message::PlayerRemoved(body) => out.pod(body),
            Message::ServerMessage { hud, text } => {
                let text = clip(text);
                out.pod(&wire::ServerMessageHeader {
                    is_hud: *hud as u32,
                    length: text.len() as u32,
                });
                out.bytes(text.as_bytes());
            }
            Message::PlayerMessage {
                sender,
                recipient_type,
                recipient,
                text,
            } => {
                let text = clip(text);
                out.pod(&wire::PlayerMessageHeader {
                    sender: *sender,
                    recipient_type: *recipient_type,
                    recipient: *recipient,
                    length: text.len() as u32,
                });
                out.bytes(text.as_bytes());
            }
            Message::PuffSpawned(body) => out.pod(body),
            Message::BloodSpawned(body) => out.pod(body),
            Message::ActorSpawned(body) => out.pod(body),
            Message::ActorPosition(body) => out.pod(body),
            Message::ActorTarget(body) => out.pod(body),
            Message::ActorState(body) => out.pod(body),
            Message::ActorDamaged(body) => out.pod(body),
            Message::ActorKilled(body) => out.pod(body),
            Message::ActorRemoved(body) => out.pod(body),
            Message::LineActivated(body) => out.pod(body),
            Message::MonsterActive(body) | Message::MonsterAwakened(body) => out.pod(body),
            Message::MissileSpawned(body) => out.pod(body),
            Message::MissileExploded(body) => out.pod(body),
            Message::ThinkerSpawned { header, status } => {
                out.pod(&wire::ThinkerSpawnHeader {
                    kind: status.kind() as u32,
                    ..*header
                });
                out.bytes(status.bytes());
            }
            Message::ThinkerStatus {
                net_id,
                command_index,
                status,
            } => {
                out.pod(&wire::ThinkerHeader {
                    net_id: net_id.raw(),
                    command_index: *command_index,
                    kind: status.kind() as u32,
                });
                out.bytes(status.bytes());
            }
            Message::ThinkerRemoved {
                net_id,
                command_index,
                kind,
            } => out.pod(&wire::ThinkerHeader {
                net_id: net_id.raw(),
                command_index: *command_index,
                kind: *kind as u32,
            }),
            Message::SectorPosition(body) => out.pod(body),
            Message::AnnouncerEvent(body) => out.pod(body),
            Message::TicFinished => {}
        }
        out.0
    }

    /// Decodes and validates one message. Nothing is trusted until it has been checked.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut input = Reader::new(bytes);
        let header: MessageHeader = input.pod()?;
        let message_type = MessageType::from_tag(header.message_type)?;

        let message = match message_type {
            MessageType::InitialState => {
                let body: wire::InitialState = input.pod()?;
                check_client("player number", body.player_number)?;
                Message::InitialState(body)
            }
            MessageType::CurrentState => Message::CurrentState(input.pod()?),
            MessageType::Sync => Message::Sync(input.pod()?),
            MessageType::MapStarted => Message::MapStarted(input.pod()?),
            MessageType::MapCompleted => Message::MapCompleted(input.pod()?),
            MessageType::AuthResult => {
                let body: wire::AuthResult = input.pod()?;
                Message::AuthResult(AuthLevel::from_raw(body.level)?)
            }
            MessageType::ClientInit => {
                let body: wire::ClientInit = input.pod()?;
                check_client("client number", body.client_number)?;
                Message::ClientInit(body)
            }
            MessageType::PlayerCommand => {
                let bundle: wire::CommandBundleHeader = input.pod()?;
                check_client("client number", bundle.client_number)?;
                if bundle.count as usize > MAX_COMMAND_BUNDLE_SIZE {
                    return Err(invalid("command count", bundle.count));
                }
                let commands = (0..bundle.count)
                    .map(|_| Command::try_from(input.pod::<wire::WireCommand>()?))
                    .collect::<Result<Vec<_>, _>>()?;
                Message::PlayerCommand {
                    client_number: bundle.client_number,
                    commands,
                }
            }
            MessageType::ClientStatus => {
                let body: wire::ClientStatus = input.pod()?;
                check_client("client number", body.client_number)?;
                Message::ClientStatus(body)
            }
            MessageType::PlayerSpawned => {
                let body: wire::PlayerSpawned = input.pod()?;
                check_client("player number", body.player_number)?;
                Message::PlayerSpawned(body)
            }
            MessageType::PlayerRemoved => {
                let body: wire::PlayerRemoved = input.pod()?;
                check_client("player number", body.player_number)?;
                Message::PlayerRemoved(body)
            }
            MessageType::ServerMessage => {
                let body: wire::ServerMessageHeader = input.pod()?;
                Message::ServerMessage {
                    hud: body.is_hud != 0,
                    text: input.text(body.length)?,
                }
            }
            MessageType::PlayerMessage => {
                let body: wire::PlayerMessageHeader = input.pod()?;
                check_client("sender", body.sender)?;
                Message::PlayerMessage {
                    sender: body.sender,
                    recipient_type: body.recipient_type,
                    recipient: body.recipient,
                    text: input.text(body.length)?,
                }
            }
            MessageType::PuffSpawned => Message::PuffSpawned(input.pod()?),
            MessageType::BloodSpawned => Message::BloodSpawned(input.pod()?),
            MessageType::ActorSpawned => Message::ActorSpawned(input.pod()?),
            MessageType::ActorPosition => Message::ActorPosition(input.pod()?),
            MessageType::ActorTarget => Message::ActorTarget(input.pod()?),
            MessageType::ActorState => Message::ActorState(input.pod()?),
            MessageType::ActorDamaged => Message::ActorDamaged(input.pod()?),
            MessageType::ActorKilled => Message::ActorKilled(input.pod()?),
            MessageType::ActorRemoved => Message::ActorRemoved(input.pod()?),
            MessageType::LineActivated => {
                let body: wire::LineActivated = input.pod()?;
                if body.side > 1 {
                    return Err(invalid("line side", body.side));
                }
                if body.activation >= ACTIVATION_TYPES {
                    return Err(invalid("activation type", body.activation));
                }
                Message::LineActivated(body)
            }
            MessageType::MonsterActive => Message::MonsterActive(input.pod()?),
            MessageType::MonsterAwakened => Message::MonsterAwakened(input.pod()?),
            MessageType::MissileSpawned => Message::MissileSpawned(input.pod()?),
            MessageType::MissileExploded => Message::MissileExploded(input.pod()?),
            MessageType::ThinkerSpawned => {
                let header: wire::ThinkerSpawnHeader = input.pod()?;
                let kind = thinker_kind(header.kind)?;
                Message::ThinkerSpawned {
                    header,
                    status: input.status(kind)?,
                }
            }
            MessageType::ThinkerStatus => {
                let header: wire::ThinkerHeader = input.pod()?;
                let kind = thinker_kind(header.kind)?;
                Message::ThinkerStatus {
                    net_id: NetId::from_raw(header.net_id),
                    command_index: header.command_index,
                    status: input.status(kind)?,
                }
            }
            MessageType::ThinkerRemoved => {
                let header: wire::ThinkerHeader = input.pod()?;
                Message::ThinkerRemoved {
                    net_id: NetId::from_raw(header.net_id),
                    command_index: header.command_index,
                    kind: thinker_kind(header.kind)?,
                }
            }
            MessageType::SectorPosition => Message::SectorPosition(input.pod()?),
            MessageType::AnnouncerEvent => Message::AnnouncerEvent(input.pod()?),
            MessageType::TicFinished => Message::TicFinished,
        };

        Ok(Self {
            world_index: header.world_index,
            message,
        })
    }
}

fn invalid(field: &'static str, value: u32) -> ProtocolError {
    ProtocolError::InvalidValue {
        field,
        value: value as i64,
    }
}

fn check_client(field: &'static str, number: u32) -> Result<(), ProtocolError> {
    if number as usize >= MAX_CLIENTS {
        return Err(invalid(field, number));
    }
    Ok(())
}

fn thinker_kind(raw: u32) -> Result<ThinkerKind, ProtocolError> {
    ThinkerKind::from_raw(raw).ok_or(invalid("thinker kind", raw))
}

fn clip(text: &str) -> &str {
    if text.len() <= MAX_STRING_SIZE {
        return text;
    }
    let mut end = MAX_STRING_SIZE;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[derive(Default)]
struct Writer(Vec<u8>);

impl Writer {
    fn pod<T: Pod>(&mut self, value: &T) {
        self.0.extend_from_slice(bytemuck::bytes_of(value));
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self.offset + len;
        let slice = self.bytes.get(self.offset..end).ok_or(ProtocolError::Truncated {
            needed: end,
            actual: self.bytes.len(),
        })?;
        self.offset = end;
        Ok(slice)
    }

    fn pod<T: Pod>(&mut self) -> Result<T, ProtocolError> {
        let slice = self.take(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(slice))
    }

    fn text(&mut self, declared: u32) -> Result<String, ProtocolError> {
        if declared as usize > MAX_STRING_SIZE {
            return Err(ProtocolError::StringTooLong {
                declared,
                max: MAX_STRING_SIZE,
            });
        }
        let slice = self.take(declared as usize)?;
        std::str::from_utf8(slice)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidString)
    }

    fn status(&mut self, kind: ThinkerKind) -> Result<ThinkerStatus, ProtocolError> {
        let size = ThinkerStatus::size_for(kind);
        let needed = self.offset + size;
        let actual = self.bytes.len();
        let slice = self.take(size)?;
        ThinkerStatus::read(kind, slice).ok_or(ProtocolError::Truncated { needed, actual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::from_int;
    use crate::net::protocol::HEADER_SIZE;
    use crate::simulation::Buttons;
    use crate::thinker::DoorStatus;

    fn text_message(declared: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(bytemuck::bytes_of(&MessageHeader::new(
            MessageType::ServerMessage,
            5,
        )));
        bytes.extend_from_slice(bytemuck::bytes_of(&wire::ServerMessageHeader {
            is_hud: 0,
            length: declared,
        }));
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn thinker_spawn_survives_the_wire() {
        let message = NetMessage::new(
            12,
            Message::ThinkerSpawned {
                header: wire::ThinkerSpawnHeader {
                    net_id: 42,
                    command_index: 9,
                    kind: 0,
                    sector: 10,
                    line: 3,
                    sound_sequence: 0,
                },
                status: ThinkerStatus::Door(DoorStatus::raise(from_int(64))),
            },
        );
        let bytes = message.encode();
        let decoded = NetMessage::decode(&bytes).unwrap();
        let Message::ThinkerSpawned { header, status } = &decoded.message else {
            panic!("wrong message {:?}", decoded.message);
        };
        assert_eq!(header.kind, ThinkerKind::Door as u32);
        assert_eq!(status.kind(), ThinkerKind::Door);
        assert_eq!(decoded.world_index, 12);

        assert!(matches!(
            NetMessage::decode(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn command_bundle_keeps_order() {
        let commands: Vec<Command> = (1..=3)
            .map(|i| Command {
                world_index: i,
                forward_move: 10 * i as i8,
                buttons: Buttons::USE,
                ..Default::default()
            })
            .collect();
        let message = NetMessage::new(
            3,
            Message::PlayerCommand {
                client_number: 1,
                commands: commands.clone(),
            },
        );
        assert_eq!(NetMessage::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn oversized_string_is_rejected_before_reading() {
        // only four payload bytes present; the length check must fire first
        let bytes = text_message(300, b"evil");
        assert_eq!(
            NetMessage::decode(&bytes),
            Err(ProtocolError::StringTooLong {
                declared: 300,
                max: MAX_STRING_SIZE
            })
        );
    }

    #[test]
    fn short_string_payload_is_truncated() {
        let bytes = text_message(10, b"abc");
        assert!(matches!(
            NetMessage::decode(&bytes),
            Err(ProtocolError::Truncated { .. })
        ));
        let bytes = text_message(2, &[0xff, 0xfe]);
        assert_eq!(NetMessage::decode(&bytes), Err(ProtocolError::InvalidString));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let line = NetMessage::new(
            1,
            Message::LineActivated(wire::LineActivated {
                side: 2,
                ..Default::default()
            }),
        );
        assert_eq!(
            NetMessage::decode(&line.encode()),
            Err(ProtocolError::InvalidValue {
                field: "line side",
                value: 2
            })
        );

        let client = NetMessage::new(
            1,
            Message::ClientInit(wire::ClientInit {
                client_number: MAX_CLIENTS as u32,
                ..Default::default()
            }),
        );
        assert!(NetMessage::decode(&client.encode()).is_err());

        let mut bytes = NetMessage::new(1, Message::TicFinished).encode();
        bytes.extend_from_slice(bytemuck::bytes_of(&wire::ThinkerHeader {
            net_id: 1,
            command_index: 1,
            kind: 9,
        }));
        bytes[..4].copy_from_slice(&(MessageType::ThinkerRemoved as i32).to_ne_bytes());
        assert_eq!(
            NetMessage::decode(&bytes),
            Err(ProtocolError::InvalidValue {
                field: "thinker kind",
                value: 9
            })
        );
    }

    #[test]
    fn long_text_is_clipped_on_encode() {
        let message = NetMessage::new(
            1,
            Message::ServerMessage {
                hud: true,
                text: "é".repeat(200),
            },
        );
        let bytes = message.encode();
        assert!(bytes.len() <= HEADER_SIZE + 8 + MAX_STRING_SIZE);
        let Message::ServerMessage { text, .. } = NetMessage::decode(&bytes).unwrap().message
        else {
            panic!("expected server message");
        };
        assert_eq!(text.chars().count(), 127);
    }
}
