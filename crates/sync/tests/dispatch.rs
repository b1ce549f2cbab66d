mod common;

use std::time::Duration;

use common::Harness;
use ticsync::net::wire;
use ticsync::net::{MAX_CLIENTS, MessageHeader, MessageType};
use ticsync::{
    ConnectionState, Message, NetId, NetMessage, PacketBufferSize, ProtocolError, SyncConfig,
    SyncError,
};

fn spawn_imp(net_id: u32) -> Message {
    Message::ActorSpawned(wire::ActorSpawned {
        net_id,
        position: [0, 0, 0],
        kind: 2,
        sector: 0,
        ..Default::default()
    })
}

#[test]
fn test_messages_wait_for_their_world() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();

    h.send(2, Message::ActorRemoved(wire::ActorRemoved { net_id: 5 }));
    h.send(1, spawn_imp(5));
    h.send(
        1,
        Message::ActorDamaged(wire::ActorDamaged {
            target_net_id: 5,
            health_damage: 30,
            ..Default::default()
        }),
    );
    h.pump();

    let id = NetId::from_raw(5);
    assert_eq!(h.client.buffered(), 3);
    assert!(!h.client.world().actors.contains(id));

    h.run_worlds(1);
    assert_eq!(h.client.world().actors.get(id).unwrap().health, 70);
    assert_eq!(h.client.buffered(), 1);

    h.run_worlds(1);
    assert!(!h.client.world().actors.contains(id));
    assert_eq!(h.client.buffered(), 0);
}

#[test]
fn test_late_message_drops_the_connection() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();
    h.run_worlds(3);

    h.send(2, spawn_imp(5));
    let result = h.client.poll_network();
    assert!(matches!(
        result,
        Err(SyncError::Desync {
            message_index: 2,
            current_index: 3,
            message_type: MessageType::ActorSpawned,
        })
    ));
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    let announced: Vec<String> = h.client.effects_mut().drain_announcements().collect();
    assert_eq!(announced.len(), 1);
    assert!(announced[0].starts_with("Disconnected"));
}

#[test]
fn test_late_message_is_applied_under_constant_prediction() {
    let config = SyncConfig {
        constant_prediction: true,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();
    h.run_worlds(3);

    h.send(2, spawn_imp(5));
    h.pump();
    assert!(h.client.world().actors.contains(NetId::from_raw(5)));
    assert!(h.client.context().flush_requested);
    assert!(h.client.is_connected());
}

#[test]
fn test_backlog_overflow_fast_forwards_under_constant_prediction() {
    let config = SyncConfig {
        constant_prediction: true,
        max_latency_secs: 1,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();
    h.run_worlds(1);

    h.send(40, Message::TicFinished);
    h.pump();

    let stats = h.client.stats();
    assert_eq!(h.client.context().current_world_index, 38);
    assert_eq!(stats.fast_forwards, 1);
    assert_eq!(stats.replays, 1);
    assert_eq!(stats.worlds_run, 38);
    assert!(h.client.is_connected());
}

#[test]
fn test_backlog_overflow_drops_the_connection() {
    let config = SyncConfig {
        max_latency_secs: 1,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();
    h.run_worlds(1);

    h.send(40, Message::TicFinished);
    assert!(matches!(
        h.client.poll_network(),
        Err(SyncError::BufferOverflow { backlog: 39 })
    ));
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
}

#[test]
fn test_oversized_string_is_discarded() {
    let mut bytes = bytemuck::bytes_of(&MessageHeader::new(MessageType::ServerMessage, 1)).to_vec();
    bytes.extend_from_slice(bytemuck::bytes_of(&wire::ServerMessageHeader {
        is_hud: 1,
        length: 300,
    }));
    bytes.extend_from_slice(&[b'a'; 300]);
    assert_eq!(
        NetMessage::decode(&bytes),
        Err(ProtocolError::StringTooLong {
            declared: 300,
            max: 255
        })
    );

    let mut h = Harness::new(4, SyncConfig::default());
    h.join();
    h.send_raw(&bytes);
    h.pump();
    h.run_worlds(1);

    assert_eq!(h.client.stats().messages_discarded, 1);
    assert_eq!(h.client.effects_mut().drain_announcements().count(), 0);
    assert_eq!(h.client.effects_mut().drain().count(), 0);
    assert!(h.client.is_connected());
}

#[test]
fn test_unbuffered_messages_apply_on_arrival() {
    let config = SyncConfig {
        packet_buffer: PacketBufferSize::Disabled,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();

    h.send(9, spawn_imp(5));
    h.pump();
    assert!(h.client.world().actors.contains(NetId::from_raw(5)));
    assert_eq!(h.client.buffered(), 0);
}

#[test]
fn test_buffer_change_flushes_to_latest() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();
    h.send(10, Message::TicFinished);
    h.pump();
    assert_eq!(h.client.context().latest_world_index, 10);

    h.client.set_packet_buffer(PacketBufferSize::Fixed(4));
    let ran = h.client.try_run_tics().unwrap();
    assert_eq!(ran, 9);
    assert_eq!(h.client.context().current_world_index, 9);
    assert!(!h.client.context().flush_requested);
    assert_eq!(h.client.stats().fast_forwards, 1);
}

#[test]
fn test_silent_server_times_out() {
    let config = SyncConfig {
        max_latency_secs: 1,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();

    h.client.update(Duration::from_millis(500)).unwrap();
    let result = h.client.update(Duration::from_millis(500));
    assert!(matches!(result, Err(SyncError::Timeout(_))));
    assert_eq!(h.client.state(), ConnectionState::Disconnected);
    assert_eq!(h.client.update(Duration::from_millis(10)).unwrap(), 0);
}

#[test]
fn test_failed_authorization_is_announced() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.send(0, Message::AuthResult(wire::AuthLevel::None));
    h.pump();
    let announced: Vec<String> = h.client.effects_mut().drain_announcements().collect();
    assert_eq!(announced, vec!["Authorization failed.".to_string()]);
}

#[test]
fn test_extreme_damage_saturates_health() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();

    h.send(1, spawn_imp(5));
    h.send(
        1,
        Message::ActorDamaged(wire::ActorDamaged {
            target_net_id: 5,
            health_damage: i32::MIN,
            ..Default::default()
        }),
    );
    h.send(
        2,
        Message::ActorDamaged(wire::ActorDamaged {
            target_net_id: 5,
            health_damage: i32::MAX,
            ..Default::default()
        }),
    );
    h.pump();

    let id = NetId::from_raw(5);
    h.run_worlds(1);
    assert_eq!(h.client.world().actors.get(id).unwrap().health, i32::MAX);
    h.run_worlds(1);
    assert_eq!(h.client.world().actors.get(id).unwrap().health, 0);
    assert!(h.client.is_connected());
}

#[test]
fn test_actor_at_the_map_edge_wraps_around() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();

    h.send(
        1,
        Message::ActorSpawned(wire::ActorSpawned {
            net_id: 5,
            position: [i32::MAX, i32::MIN, 0],
            momentum: [1, -1, 0],
            kind: 2,
            sector: 0,
            ..Default::default()
        }),
    );
    h.pump();
    h.run_worlds(1);

    let actor = h.client.world().actors.get(NetId::from_raw(5)).unwrap();
    assert_eq!(actor.position.x, i32::MIN);
    assert_eq!(actor.position.y, i32::MAX);
    assert!(h.client.is_connected());
}

#[test]
fn test_out_of_range_player_number_is_refused() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.send(
        0,
        Message::InitialState(wire::InitialState {
            player_number: 9999,
            map_number: 3,
            rng_seed: 1,
        }),
    );
    h.pump();

    assert_eq!(h.client.stats().messages_discarded, 1);
    assert_eq!(h.client.context().console_player, 0);
    assert_ne!(h.client.context().map_number, 3);

    let bytes = NetMessage::new(
        0,
        Message::InitialState(wire::InitialState {
            player_number: MAX_CLIENTS as u32,
            ..Default::default()
        }),
    )
    .encode();
    assert_eq!(
        NetMessage::decode(&bytes),
        Err(ProtocolError::InvalidValue {
            field: "player number",
            value: MAX_CLIENTS as i64,
        })
    );
}
