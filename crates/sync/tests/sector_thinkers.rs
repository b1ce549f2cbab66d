mod common;

use common::{DOOR_SECTOR, Harness};
use ticsync::fixed::from_int;
use ticsync::net::wire;
use ticsync::thinker::DoorStatus;
use ticsync::{
    Message, NetId, PacketBufferSize, PlayerPosition, SyncConfig, ThinkerKind, ThinkerRef,
    ThinkerStatus,
};

fn door() -> ThinkerStatus {
    ThinkerStatus::Door(DoorStatus::raise(from_int(64)))
}

fn door_spawn(net_id: u32, command_index: u32, sector: u32) -> Message {
    Message::ThinkerSpawned {
        header: wire::ThinkerSpawnHeader {
            net_id,
            command_index,
            kind: ThinkerKind::Door as u32,
            sector,
            line: -1,
            sound_sequence: 0,
        },
        status: door(),
    }
}

fn status_report(last_command_run: u32) -> Message {
    Message::ClientStatus(wire::ClientStatus {
        client_number: 0,
        last_command_run,
        position: PlayerPosition {
            world_index: last_command_run,
            ..Default::default()
        },
        ..Default::default()
    })
}

#[test]
fn test_server_door_is_attached_to_its_sector() {
    let config = SyncConfig {
        packet_buffer: PacketBufferSize::Disabled,
        ..Default::default()
    };
    let mut h = Harness::new(12, config);
    h.join();

    h.send(1, door_spawn(42, 1, 10));
    h.pump();

    let id = NetId::from_raw(42);
    let thinker = h.client.world().thinkers.get(id).unwrap();
    assert_eq!(thinker.kind(), ThinkerKind::Door);
    assert_eq!(thinker.sector, 10);
    assert!(!thinker.is_predicted());
    assert_eq!(
        h.client.world().sectors[10].thinkers,
        vec![ThinkerRef::Confirmed(id)]
    );
}

#[test]
fn test_spawn_on_missing_sector_is_dropped() {
    let config = SyncConfig {
        packet_buffer: PacketBufferSize::Disabled,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();

    h.send(1, door_spawn(42, 1, 99));
    h.pump();
    assert!(h.client.world().thinkers.is_empty());
    assert!(h.client.is_connected());
}

#[test]
fn test_predicted_door_is_confirmed_by_the_server() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();
    h.run_worlds(1);

    let predicted = h
        .client
        .predict_activation(DOOR_SECTOR, door(), 0)
        .unwrap()
        .unwrap();
    assert!(h.client.world().predicted_thinkers.contains(predicted));
    assert_eq!(
        h.client.world().sectors[DOOR_SECTOR].thinkers,
        vec![ThinkerRef::Predicted(predicted)]
    );
    // one activation per sector
    assert!(
        h.client
            .predict_activation(DOOR_SECTOR, door(), 0)
            .unwrap()
            .is_none()
    );

    h.send(2, door_spawn(42, 1, DOOR_SECTOR as u32));
    h.pump();
    h.run_worlds(1);

    let id = NetId::from_raw(42);
    assert!(h.client.world().predicted_thinkers.is_empty());
    assert!(!h.client.world().thinkers.get(id).unwrap().is_predicted());
    assert_eq!(
        h.client.world().sectors[DOOR_SECTOR].thinkers,
        vec![ThinkerRef::Confirmed(id)]
    );
    assert_eq!(h.client.stats().thinkers_expired, 0);
}

#[test]
fn test_unconfirmed_door_is_torn_down() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();
    h.run_worlds(1);

    h.client
        .predict_activation(DOOR_SECTOR, door(), 0)
        .unwrap()
        .unwrap();
    h.run_worlds(1);
    assert!(h.client.predict());
    assert!(h.client.world().sectors[DOOR_SECTOR].ceiling_height > 0);

    // the server has run the activating command and said nothing about a door
    h.send(3, status_report(2));
    h.pump();
    h.run_worlds(1);

    let sector = &h.client.world().sectors[DOOR_SECTOR];
    assert!(h.client.world().predicted_thinkers.is_empty());
    assert!(sector.thinkers.is_empty());
    assert_eq!(sector.ceiling_height, 0);
    assert_eq!(h.client.stats().thinkers_expired, 1);
}

#[test]
fn test_removed_door_lingers_until_confirmed() {
    let mut h = Harness::new(4, SyncConfig::default());
    h.join();

    h.send(1, door_spawn(42, 1, DOOR_SECTOR as u32));
    h.send(
        2,
        Message::ThinkerRemoved {
            net_id: NetId::from_raw(42),
            command_index: 3,
            kind: ThinkerKind::Door,
        },
    );
    h.send(3, status_report(3));
    h.pump();

    let id = NetId::from_raw(42);
    h.run_worlds(2);
    let thinker = h.client.world().thinkers.get(id).unwrap();
    assert_eq!(thinker.removal().unwrap().index, 3);

    h.run_worlds(1);
    assert!(!h.client.world().thinkers.contains(id));
    assert!(h.client.world().sectors[DOOR_SECTOR].thinkers.is_empty());
}

#[test]
fn test_removal_of_the_wrong_kind_is_ignored() {
    let config = SyncConfig {
        packet_buffer: PacketBufferSize::Disabled,
        prediction: false,
        ..Default::default()
    };
    let mut h = Harness::new(4, config);
    h.join();

    h.send(1, door_spawn(42, 1, DOOR_SECTOR as u32));
    h.send(
        2,
        Message::ThinkerRemoved {
            net_id: NetId::from_raw(42),
            command_index: 2,
            kind: ThinkerKind::Platform,
        },
    );
    h.pump();
    assert!(h.client.world().thinkers.contains(NetId::from_raw(42)));

    h.send(
        3,
        Message::ThinkerRemoved {
            net_id: NetId::from_raw(42),
            command_index: 3,
            kind: ThinkerKind::Door,
        },
    );
    h.pump();
    assert!(h.client.world().thinkers.is_empty());
    assert!(h.client.world().sectors[DOOR_SECTOR].thinkers.is_empty());
}
