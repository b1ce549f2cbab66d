mod clock;
mod command;
mod rules;

pub use clock::TicClock;
pub use command::{Buttons, Command, CommandBuffer, InputState, MAX_MOVE};
pub use rules::{BasicRules, GRAVITY, GameRules, JUMP_MOMENTUM};
