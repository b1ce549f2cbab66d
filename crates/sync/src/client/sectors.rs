use crate::net::Transport;
use crate::net::wire::{SectorPositionUpdate, ThinkerSpawnHeader};
use crate::netid::NetId;
use crate::simulation::GameRules;
use crate::thinker::{SectorThinker, ThinkerKind, ThinkerStatus};
use crate::world::ThinkerRef;

use super::{SyncClient, SyncError};

impl<T: Transport, R: GameRules> SyncClient<T, R> {
    /// Starts a door, lift or other special locally, ahead of the server. The server's
    /// spawn for the same sector confirms it; silence past the activation tears it down.
    pub fn predict_activation(
        &mut self,
        sector: usize,
        status: ThinkerStatus,
        sound_sequence: i32,
    ) -> Result<Option<NetId>, SyncError> {
        if !self.prediction.is_enabled() || !self.config.predict_sector_activation {
            return Ok(None);
        }
        let Some(target) = self.world.sectors.get(sector) else {
            log::warn!("activation of missing sector {}", sector);
            return Ok(None);
        };
        if target.has_thinker() {
            return Ok(None);
        }

        let index = self.context.current_world_index;
        let thinker = SectorThinker::predicted(
            sector,
            status,
            sound_sequence,
            index,
            self.config.max_positions(),
        );
        let id = self.world.predicted_thinkers.add(thinker)?;
        self.world.sectors[sector]
            .thinkers
            .push(ThinkerRef::Predicted(id));
        log::debug!(
            "predicted {} on sector {} at command {}",
            status.kind().name(),
            sector,
            index
        );
        Ok(Some(id))
    }

    pub(super) fn handle_thinker_spawned(
        &mut self,
        header: ThinkerSpawnHeader,
        status: ThinkerStatus,
    ) -> Result<(), SyncError> {
        let Some(sector) = self.sector_in_range(header.sector, "sector thinker spawn") else {
            return Ok(());
        };
        let id = NetId::from_raw(header.net_id);
        let predicted = self.world.sectors[sector]
            .thinkers
            .iter()
            .copied()
            .find(|reference| reference.is_predicted());

        let thinker = match predicted.and_then(|reference| self.world.remove_thinker(reference)) {
            Some(mut thinker) if thinker.kind() == status.kind() => {
                log::debug!(
                    "server confirmed predicted {} on sector {} as {}",
                    status.kind().name(),
                    sector,
                    id
                );
                thinker.sound_sequence = header.sound_sequence;
                thinker.confirm(header.command_index, status);
                thinker
            }
            replaced => {
                if let Some(old) = replaced {
                    log::debug!(
                        "server replaced predicted {} on sector {} with a {}",
                        old.kind().name(),
                        sector,
                        status.kind().name()
                    );
                    self.discard_prediction(&old);
                }
                SectorThinker::from_server(
                    sector,
                    status,
                    header.sound_sequence,
                    header.command_index,
                    self.config.max_positions(),
                )
            }
        };

        self.world.thinkers.insert_at(id, thinker)?;
        self.world.sectors[sector]
            .thinkers
            .push(ThinkerRef::Confirmed(id));
        Ok(())
    }

    pub(super) fn handle_thinker_status(
        &mut self,
        id: NetId,
        command_index: u32,
        status: ThinkerStatus,
    ) {
        let predicting = self.prediction.is_enabled();
        let Some(thinker) = self.world.thinkers.get_mut(id) else {
            log::warn!("status for unknown sector thinker {}", id);
            return;
        };
        let result = if predicting {
            thinker.confirm_status(command_index, status)
        } else {
            thinker.apply_status(status)
        };
        if let Err(err) = result {
            log::warn!("discarding status for sector thinker {}: {}", id, err);
        }
    }

    pub(super) fn handle_thinker_removed(
        &mut self,
        id: NetId,
        command_index: u32,
        kind: ThinkerKind,
    ) {
        let Some(thinker) = self.world.thinkers.get_mut(id) else {
            log::warn!("removal of unknown sector thinker {}", id);
            return;
        };
        if thinker.kind() != kind {
            log::warn!(
                "removal of {} {} names it a {}",
                thinker.kind().name(),
                id,
                kind.name()
            );
            return;
        }
        if self.prediction.is_enabled() {
            // kept until the confirmed command index passes the removal
            thinker.mark_removed(command_index, true);
        } else {
            self.world.remove_thinker(ThinkerRef::Confirmed(id));
        }
    }

    pub(super) fn handle_sector_position(&mut self, body: SectorPositionUpdate) {
        let Some(number) = self.sector_in_range(body.sector_number, "sector position") else {
            return;
        };
        let position = body.position;
        if !self.prediction.is_enabled() {
            position.apply(&mut self.world.sectors[number]);
            return;
        }

        let store = self.prediction.store_mut();
        store.confirm_sector(position.world_index, number, position);
        let sector = &mut self.world.sectors[number];
        if !sector.has_thinker() {
            // nothing will replay over it
            store.revert_sector(
                number,
                position.world_index,
                self.context.current_world_index,
                sector,
            );
        }
    }

    /// Tears down unconfirmed activations and collects thinkers whose removal the
    /// server has confirmed.
    pub(super) fn sweep_thinkers(&mut self) {
        let current = self.context.current_world_index;
        let cutoff = self.context.activation_cutoff;
        let expired: Vec<NetId> = self
            .world
            .predicted_thinkers
            .iter()
            .filter(|(_, thinker)| thinker.expired(cutoff, current))
            .map(|(id, _)| id)
            .collect();
        for id in expired {
            if let Some(thinker) = self.world.remove_thinker(ThinkerRef::Predicted(id)) {
                log::debug!(
                    "predicted {} on sector {} was never confirmed",
                    thinker.kind().name(),
                    thinker.sector
                );
                self.discard_prediction(&thinker);
                self.stats.thinkers_expired += 1;
            }
        }

        let confirmed = if self.prediction.is_enabled() {
            self.prediction.last_server_command_index()
        } else {
            current
        };
        let finished: Vec<ThinkerRef> = self
            .world
            .thinkers
            .iter()
            .filter(|(_, thinker)| thinker.collectable(confirmed))
            .map(|(id, _)| ThinkerRef::Confirmed(id))
            .chain(
                self.world
                    .predicted_thinkers
                    .iter()
                    .filter(|(_, thinker)| thinker.collectable(confirmed))
                    .map(|(id, _)| ThinkerRef::Predicted(id)),
            )
            .collect();
        for reference in finished {
            if let Some(thinker) = self.world.remove_thinker(reference) {
                log::trace!(
                    "collected {} on sector {}",
                    thinker.kind().name(),
                    thinker.sector
                );
            }
        }
    }

    fn discard_prediction(&mut self, thinker: &SectorThinker) {
        let Some(at) = thinker.predicted_at else {
            return;
        };
        let current = self.context.current_world_index;
        if let Some(sector) = self.world.sectors.get_mut(thinker.sector) {
            self.prediction
                .store_mut()
                .revert_sector(thinker.sector, at, current, sector);
        }
    }
}
