use super::args::{Cli, Commands, ConfigCommand};
use super::handlers;
use agfold_runtime::{Config, resolve_config_path};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub fn run(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = Config::load_from(&config_path)?;

    init_tracing(&cli, &config);

    match cli.command {
        Commands::Replay {
            file,
            protocol,
            session,
            disconnect,
        } => handlers::replay::handle(&config, &file, protocol, session.as_deref(), disconnect),

        Commands::Config { command } => match command {
            ConfigCommand::Show => handlers::config::show(&config, &config_path),
            ConfigCommand::Init { force } => handlers::config::init(&config_path, force),
        },
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cli
            .log_level
            .map(|level| level.to_string())
            .unwrap_or_else(|| config.log_level.clone());
        EnvFilter::new(level)
    });

    // A second init (tests driving `run` twice) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
