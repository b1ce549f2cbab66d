mod actor;
mod player;
mod sector;

pub use actor::{Actor, ActorFlags, ActorKind, PLAYER_HEIGHT, PLAYER_RADIUS};
pub use player::{ClientInfo, Player, PlayerState, VIEW_HEIGHT};
pub use sector::{Sector, ThinkerRef};

use crate::net::protocol::MAX_CLIENTS;
use crate::netid::{NetId, NetIdRegistry};
use crate::thinker::SectorThinker;

/// Simulation state shared by the step driver, the prediction engine and the renderer.
#[derive(Debug, Clone)]
pub struct World {
    pub sectors: Vec<Sector>,
    pub actors: NetIdRegistry<Actor>,
    pub thinkers: NetIdRegistry<SectorThinker>,
    pub predicted_thinkers: NetIdRegistry<SectorThinker>,
    pub players: Vec<Player>,
    pub clients: Vec<ClientInfo>,
    pub leveltime: u32,
    pub gametic: u32,
}

impl World {
    pub fn new(sectors: Vec<Sector>) -> Self {
        Self {
            sectors,
            actors: NetIdRegistry::new(),
            thinkers: NetIdRegistry::new(),
            predicted_thinkers: NetIdRegistry::new(),
            players: vec![Player::default(); MAX_CLIENTS],
            clients: vec![ClientInfo::default(); MAX_CLIENTS],
            leveltime: 0,
            gametic: 0,
        }
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn player_actor(&self, player: usize) -> Option<&Actor> {
        let id = self.players.get(player)?.actor?;
        self.actors.get(id)
    }

    pub fn player_and_actor_mut(&mut self, player: usize) -> Option<(&mut Player, &mut Actor)> {
        let player = self.players.get_mut(player)?;
        let actor = self.actors.get_mut(player.actor?)?;
        Some((player, actor))
    }

    pub fn player_for_actor(&self, id: NetId) -> Option<usize> {
        if id.is_none() {
            return None;
        }
        self.players.iter().position(|p| p.actor == Some(id))
    }

    pub fn thinker(&self, reference: ThinkerRef) -> Option<&SectorThinker> {
        match reference {
            ThinkerRef::Confirmed(id) => self.thinkers.get(id),
            ThinkerRef::Predicted(id) => self.predicted_thinkers.get(id),
        }
    }

    pub fn thinker_mut(&mut self, reference: ThinkerRef) -> Option<&mut SectorThinker> {
        match reference {
            ThinkerRef::Confirmed(id) => self.thinkers.get_mut(id),
            ThinkerRef::Predicted(id) => self.predicted_thinkers.get_mut(id),
        }
    }

    /// Unregisters a thinker and drops every sector reference to it.
    pub fn remove_thinker(&mut self, reference: ThinkerRef) -> Option<SectorThinker> {
        let thinker = match reference {
            ThinkerRef::Confirmed(id) => self.thinkers.remove(id),
            ThinkerRef::Predicted(id) => self.predicted_thinkers.remove(id),
        }?;
        if let Some(sector) = self.sectors.get_mut(thinker.sector) {
            sector.detach(reference);
        }
        Some(thinker)
    }

    pub fn reset_net_ids(&mut self) {
        self.actors.clear();
        self.thinkers.clear();
        self.predicted_thinkers.clear();
        for sector in &mut self.sectors {
            sector.thinkers.clear();
        }
        for player in &mut self.players {
            player.actor = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::from_int;
    use glam::IVec3;

    #[test]
    fn player_actor_lookup() {
        let mut world = World::new(vec![Sector::new(0, from_int(128))]);
        let id = world
            .actors
            .add(Actor::new(ActorKind::Player, IVec3::ZERO, 0))
            .unwrap();
        world.players[2].actor = Some(id);

        assert_eq!(world.player_for_actor(id), Some(2));
        assert!(world.player_actor(2).is_some());
        assert!(world.player_and_actor_mut(0).is_none());

        world.actors.remove(id);
        assert!(world.player_actor(2).is_none());
    }
}
