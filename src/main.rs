mod app;
mod cli;
mod config;
mod consts;
mod core;
mod error;
mod files;
mod output;
mod source;
mod utils;

use clap::Parser;
use tracing::debug;

use cli::{Cli, parse_command};
use config::Config;
use error::AppError;
use utils::init_logger;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let (config, config_path) = Config::load(cli.config.as_deref())?;
    let mut cli = cli.with_config(&config);
    init_logger(cli.debug);

    if let Some(path) = &config_path {
        debug!(path = %path.display(), "loaded config");
    }

    let action = parse_command(cli.command.take());
    app::run(&cli, &config, action)
}
