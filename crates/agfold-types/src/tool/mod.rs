pub mod args;
pub mod input;
pub mod kind;

pub use args::*;
pub use input::*;
pub use kind::*;
