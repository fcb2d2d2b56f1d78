//! Maestro CLI entry point.

use clap::Parser;
use tracing::Level;

use maestro::cli::{handle_error, Cli, Commands};
use maestro::cli::commands::{agent, chat, init, plan, records};
use maestro::infrastructure::config::ConfigLoader;
use maestro::infrastructure::logging::{LogSettings, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => handle_error(err, json_mode),
    };

    let settings = match LogSettings::try_from(&config.logging) {
        Ok(settings) if cli.verbose => settings.with_min_level(Level::DEBUG),
        Ok(settings) => settings,
        Err(err) => handle_error(err.into(), json_mode),
    };
    // Dropping the logger flushes the file writer.
    let _logger = match LoggerImpl::init(&settings) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json_mode),
    };

    let result = match cli.command {
        Commands::Init(args) => init::execute(args, &config, json_mode).await,
        Commands::Agent(args) => agent::execute(args, config, json_mode).await,
        Commands::Plan(args) => plan::execute(args, config, json_mode).await,
        Commands::Chat(args) => chat::execute(args, config, json_mode).await,
        Commands::Prompt(args) => chat::execute_prompt(args, config, json_mode).await,
        Commands::Records(args) => records::execute(args, config, json_mode).await,
    };

    if let Err(err) = result {
        handle_error(err, json_mode);
    }
}
