mod args;
mod commands;
mod handlers;
pub mod types;

pub use args::{Cli, Commands, ConfigCommand};
pub use commands::run;
