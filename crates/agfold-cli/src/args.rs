use crate::types::{LogLevel, ProtocolArg};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agfold")]
#[command(about = "Fold agent event streams into chat transcripts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to $AGFOLD_CONFIG, then the XDG config dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Overrides the config's log level; RUST_LOG wins over both
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSONL capture and print the resulting session state
    Replay {
        /// One JSON event per line
        file: PathBuf,

        #[arg(long)]
        protocol: ProtocolArg,

        /// Force every stream-json line and bare ACP update into this session
        /// and print only it; otherwise stream-json lines follow their own
        /// `session_id`
        #[arg(long)]
        session: Option<String>,

        /// Treat end of file as the agent process exiting
        #[arg(long)]
        disconnect: bool,
    },

    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Write a default config file to the resolved path
    Init {
        #[arg(long)]
        force: bool,
    },
}
