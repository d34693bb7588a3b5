pub mod action;
pub mod decoder;
pub mod opcode;

pub use action::{Action, ActionRecord, PushValue};
pub use decoder::decode_actions;
pub use opcode::OpCode;
