use std::collections::VecDeque;

use glam::IVec3;

use crate::netid::NetId;

/// Why the simulation is currently running. Only `Live` steps produce side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationMode {
    #[default]
    Live,
    Replaying,
    ApplyingServerSnapshot,
}

impl SimulationMode {
    pub fn allows_side_effects(self) -> bool {
        matches!(self, SimulationMode::Live)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    PlayerJump,
    PlayerLand,
    PlayerPain,
    PlayerDeath,
    DoorOpen,
    DoorClose,
    PlatformStart,
    PlatformStop,
    StoneMove,
    Sequence(i32),
    MonsterActive(i32),
    MonsterSight(i32),
    MissileLaunch,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    Puff,
    Blood,
    Explosion,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Sound {
        source: Option<NetId>,
        sector: Option<usize>,
        sound: Sound,
    },
    Particle {
        kind: ParticleKind,
        position: IVec3,
    },
    Hud(String),
    LineActivated {
        actor: NetId,
        line: i32,
        side: u32,
        activation: u32,
    },
    Announcer {
        event: u32,
        source: NetId,
    },
}

pub const MAX_PENDING_EFFECTS: usize = 1024;

/// Side effects and announcements waiting for the frontend. Both queues hold at
/// most `max_pending` entries; the oldest is dropped to make room.
#[derive(Debug)]
pub struct Effects {
    pending: VecDeque<SideEffect>,
    announcements: VecDeque<String>,
    max_pending: usize,
    suppressed: u64,
    dropped: u64,
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PENDING_EFFECTS)
    }

    pub fn with_capacity(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            pending: VecDeque::with_capacity(max_pending.min(64)),
            announcements: VecDeque::new(),
            max_pending,
            suppressed: 0,
            dropped: 0,
        }
    }

    pub fn emit(&mut self, mode: SimulationMode, effect: SideEffect) {
        if mode.allows_side_effects() {
            if self.pending.len() >= self.max_pending {
                self.pending.pop_front();
                self.dropped += 1;
            }
            self.pending.push_back(effect);
        } else {
            log::trace!("suppressed {:?} while {:?}", effect, mode);
            self.suppressed += 1;
        }
    }

    pub fn sound(&mut self, mode: SimulationMode, source: Option<NetId>, sound: Sound) {
        self.emit(
            mode,
            SideEffect::Sound {
                source,
                sector: None,
                sound,
            },
        );
    }

    pub fn sector_sound(&mut self, mode: SimulationMode, sector: usize, sound: Sound) {
        self.emit(
            mode,
            SideEffect::Sound {
                source: None,
                sector: Some(sector),
                sound,
            },
        );
    }

    pub fn particle(&mut self, mode: SimulationMode, kind: ParticleKind, position: IVec3) {
        self.emit(mode, SideEffect::Particle { kind, position });
    }

    pub fn hud(&mut self, mode: SimulationMode, text: impl Into<String>) {
        self.emit(mode, SideEffect::Hud(text.into()));
    }

    /// User-visible status text. Delivered regardless of simulation mode.
    pub fn announce(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        if self.announcements.len() >= self.max_pending {
            self.announcements.pop_front();
            self.dropped += 1;
        }
        self.announcements.push_back(text);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = SideEffect> + '_ {
        self.pending.drain(..)
    }

    pub fn drain_announcements(&mut self) -> impl Iterator<Item = String> + '_ {
        self.announcements.drain(..)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Entries lost because nobody drained the queues in time.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_suppresses_effects() {
        let mut effects = Effects::new();
        effects.sound(SimulationMode::Replaying, None, Sound::PlayerJump);
        effects.hud(SimulationMode::ApplyingServerSnapshot, "hidden");
        assert_eq!(effects.pending(), 0);
        assert_eq!(effects.suppressed(), 2);

        effects.sound(SimulationMode::Live, None, Sound::PlayerJump);
        let drained: Vec<_> = effects.drain().collect();
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn announcements_ignore_mode() {
        let mut effects = Effects::new();
        effects.announce("Authorization failed.");
        let texts: Vec<_> = effects.drain_announcements().collect();
        assert_eq!(texts, vec!["Authorization failed.".to_string()]);
    }

    #[test]
    fn undrained_queues_keep_the_newest() {
        let mut effects = Effects::with_capacity(3);
        for i in 0..5 {
            effects.sound(SimulationMode::Live, None, Sound::Sequence(i));
            effects.announce(format!("line {}", i));
        }
        assert_eq!(effects.pending(), 3);
        assert_eq!(effects.dropped(), 4);

        let sounds: Vec<_> = effects.drain().collect();
        assert_eq!(
            sounds[0],
            SideEffect::Sound {
                source: None,
                sector: None,
                sound: Sound::Sequence(2),
            }
        );
        let texts: Vec<_> = effects.drain_announcements().collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
    }
}
