use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub const MAX_MOVE: i8 = 50;
const RUN_MOVE: f32 = 50.0;
const WALK_MOVE: f32 = 25.0;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const ATTACK = 1 << 0;
        const USE = 1 << 1;
        const JUMP = 1 << 2;
        const ALT_ATTACK = 1 << 3;
        const CHANGE_WEAPON = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Command {
    pub world_index: u32,
    pub forward_move: i8,
    pub side_move: i8,
    pub angle_turn: i16,
    pub look: i16,
    pub buttons: Buttons,
}

impl Command {
    pub fn blank(world_index: u32) -> Self {
        Self {
            world_index,
            ..Default::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.forward_move == 0
            && self.side_move == 0
            && self.angle_turn == 0
            && self.look == 0
            && self.buttons.is_empty()
    }

    /// Compares input only, ignoring which step the command belongs to.
    pub fn same_input(&self, other: &Command) -> bool {
        Command {
            world_index: other.world_index,
            ..*self
        } == *other
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub forward: f32,
    pub side: f32,
    pub turn: f32,
    pub look: f32,
    pub run: bool,
    pub attack: bool,
    pub use_key: bool,
    pub jump: bool,
}

impl InputState {
    pub fn to_command(&self, world_index: u32) -> Command {
        let speed = if self.run { RUN_MOVE } else { WALK_MOVE };
        let mut buttons = Buttons::empty();
        buttons.set(Buttons::ATTACK, self.attack);
        buttons.set(Buttons::USE, self.use_key);
        buttons.set(Buttons::JUMP, self.jump);

        Command {
            world_index,
            forward_move: (self.forward.clamp(-1.0, 1.0) * speed) as i8,
            side_move: (self.side.clamp(-1.0, 1.0) * speed) as i8,
            angle_turn: (self.turn.clamp(-1.0, 1.0) * i16::MAX as f32) as i16,
            look: (self.look.clamp(-1.0, 1.0) * i16::MAX as f32) as i16,
            buttons,
        }
    }
}

/// Ring of the local player's commands keyed by world index.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    slots: Vec<Command>,
    latest: Option<u32>,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Command::default(); capacity.max(1)],
            latest: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: u32) -> usize {
        index as usize % self.slots.len()
    }

    pub fn record_local(&mut self, index: u32, input: &InputState, console_active: bool) -> Command {
        let command = if console_active {
            Command::blank(index)
        } else {
            input.to_command(index)
        };
        self.store(command);
        command
    }

    pub fn store(&mut self, command: Command) {
        let slot = self.slot(command.world_index);
        self.slots[slot] = command;
        self.latest = Some(
            self.latest
                .map_or(command.world_index, |latest| latest.max(command.world_index)),
        );
    }

    /// Whatever occupies the slot for `index`, which may belong to an older step.
    pub fn get(&self, index: u32) -> &Command {
        &self.slots[self.slot(index)]
    }

    pub fn get_exact(&self, index: u32) -> Option<&Command> {
        Some(self.get(index)).filter(|c| c.world_index == index)
    }

    pub fn latest_index(&self) -> Option<u32> {
        self.latest
    }

    /// The newest `count` commands up to and including `index`, oldest first.
    pub fn bundle(&self, index: u32, count: usize) -> Vec<Command> {
        let count = count.min(self.slots.len()) as u32;
        let first = index.saturating_sub(count.saturating_sub(1)).max(1);
        (first..=index).filter_map(|i| self.get_exact(i).copied()).collect()
    }

    pub fn clear(&mut self) {
        self.slots.fill(Command::default());
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_records_blank_command() {
        let mut buffer = CommandBuffer::new(8);
        let input = InputState {
            forward: 1.0,
            jump: true,
            ..Default::default()
        };
        assert!(buffer.record_local(3, &input, true).is_blank());
        assert!(!buffer.record_local(4, &input, false).is_blank());
        assert!(buffer.get(4).buttons.contains(Buttons::JUMP));
    }

    #[test]
    fn slots_wrap_without_validation() {
        let mut buffer = CommandBuffer::new(4);
        let input = InputState {
            forward: 1.0,
            ..Default::default()
        };
        buffer.record_local(1, &input, false);
        buffer.record_local(5, &InputState::default(), false);

        assert_eq!(buffer.get(1).world_index, 5);
        assert!(buffer.get_exact(1).is_none());
        assert_eq!(buffer.latest_index(), Some(5));
    }

    #[test]
    fn bundle_is_oldest_first() {
        let mut buffer = CommandBuffer::new(16);
        for i in 1..=6 {
            buffer.record_local(i, &InputState::default(), false);
        }
        let indices: Vec<u32> = buffer.bundle(6, 3).iter().map(|c| c.world_index).collect();
        assert_eq!(indices, vec![4, 5, 6]);
        assert_eq!(buffer.bundle(2, 10).len(), 2);
    }

    #[test]
    fn same_input_ignores_index() {
        let input = InputState {
            side: -1.0,
            run: true,
            ..Default::default()
        };
        let a = input.to_command(1);
        let b = input.to_command(9);
        assert_ne!(a, b);
        assert!(a.same_input(&b));
        assert_eq!(a.side_move, -MAX_MOVE);
    }

    fn serializable<T: Serialize + for<'de> Deserialize<'de>>() {}

    #[test]
    fn input_types_are_serializable() {
        serializable::<Buttons>();
        serializable::<Command>();
        serializable::<crate::world::ActorFlags>();
    }
}
