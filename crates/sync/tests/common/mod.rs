#![allow(dead_code)]

use ticsync::fixed::from_int;
use ticsync::net::wire;
use ticsync::{
    BasicRules, Channel, MemoryEndpoint, Message, NetMessage, PacketLossSimulation, Reliability,
    Sector, SyncClient, SyncConfig, Transport, World, memory_pair,
};

pub const DOOR_SECTOR: usize = 1;

/// A client wired to a bare endpoint the test drives by hand.
pub struct Harness {
    pub client: SyncClient<MemoryEndpoint, BasicRules>,
    pub server: MemoryEndpoint,
}

pub fn level(sector_count: usize) -> World {
    let sectors = (0..sector_count)
        .map(|number| {
            if number == DOOR_SECTOR {
                Sector::new(0, 0)
            } else {
                Sector::new(0, from_int(128))
            }
        })
        .collect();
    World::new(sectors)
}

impl Harness {
    pub fn new(sector_count: usize, config: SyncConfig) -> Self {
        let (client_end, server) = memory_pair(PacketLossSimulation::default(), 7);
        let client = SyncClient::new(client_end, BasicRules::new(), level(sector_count), config)
            .unwrap();
        Self { client, server }
    }

    pub fn send(&mut self, world_index: u32, message: Message) {
        let bytes = NetMessage::new(world_index, message).encode();
        self.send_raw(&bytes);
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.server
            .send(Channel::Sequenced, bytes, Reliability::Reliable)
            .unwrap();
    }

    /// Handshake for player 0 on a map starting at world 0.
    pub fn join(&mut self) {
        self.send(
            0,
            Message::InitialState(wire::InitialState {
                player_number: 0,
                map_number: 1,
                rng_seed: 99,
            }),
        );
        self.send(
            0,
            Message::MapStarted(wire::MapStarted {
                map_number: 1,
                gametic: 0,
                leveltime: 0,
            }),
        );
        self.pump();
        assert!(self.client.is_connected());
        assert!(self.client.context().synced);
    }

    pub fn pump(&mut self) -> usize {
        self.client.poll_network().unwrap()
    }

    pub fn run_worlds(&mut self, count: u32) {
        for _ in 0..count {
            self.client.run_world().unwrap();
        }
    }
}
