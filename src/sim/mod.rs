/// Editor state machine, events and the puzzle codec.

pub mod codec;
pub mod event;
pub mod pointer;
pub mod session;
