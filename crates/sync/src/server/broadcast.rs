use crate::net::wire::SectorPositionUpdate;
use crate::net::{Message, NetMessage};
use crate::netid::NetIdRegistry;
use crate::snapshot::SectorPosition;
use crate::thinker::SectorThinker;
use crate::world::Sector;

/// Remembers what each client was last told about every sector so unchanged
/// sectors cost nothing on the wire.
#[derive(Debug, Clone, Default)]
pub struct SectorBroadcaster {
    last_sent: Vec<Option<SectorPosition>>,
}

impl SectorBroadcaster {
    pub fn new(sector_count: usize) -> Self {
        Self {
            last_sent: vec![None; sector_count],
        }
    }

    /// Positions for every sector whose heights differ from the last broadcast.
    /// `command_index` is the client command the server has just run.
    pub fn sector_messages(
        &mut self,
        world_index: u32,
        command_index: u32,
        sectors: &[Sector],
    ) -> Vec<NetMessage> {
        if self.last_sent.len() != sectors.len() {
            self.last_sent.resize(sectors.len(), None);
        }
        let mut messages = Vec::new();
        for (number, (sector, last)) in sectors.iter().zip(&mut self.last_sent).enumerate() {
            let position = SectorPosition::capture(command_index, sector);
            if last.is_some_and(|sent| sent.same_heights(&position)) {
                continue;
            }
            *last = Some(position);
            messages.push(NetMessage::new(
                world_index,
                Message::SectorPosition(SectorPositionUpdate {
                    sector_number: number as u32,
                    position,
                }),
            ));
        }
        messages
    }

    /// Forces every sector out on the next broadcast, e.g. for a newly joined client.
    pub fn invalidate(&mut self) {
        self.last_sent.fill(None);
    }
}

/// One status message per thinker still running.
pub fn thinker_status_messages(
    world_index: u32,
    command_index: u32,
    thinkers: &NetIdRegistry<SectorThinker>,
) -> Vec<NetMessage> {
    thinkers
        .iter()
        .filter(|(_, thinker)| thinker.removal().is_none())
        .map(|(id, thinker)| {
            NetMessage::new(
                world_index,
                Message::ThinkerStatus {
                    net_id: id,
                    command_index,
                    status: *thinker.status(),
                },
            )
        })
        .collect()
}
