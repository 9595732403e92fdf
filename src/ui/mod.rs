/// Terminal front end.

pub mod input;
pub mod renderer;
