// CLI binary entry point for lamepipe

mod cli;

use std::io;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::commands::{command_encode, command_genres, command_inspect};
use cli::{Commands, Config, OutputFormatter};

fn main() {
    let config = Config::parse();
    init_tracing(&config);

    let formatter = OutputFormatter::new(config.format, config.quiet);
    let result = match &config.command {
        Commands::Encode(args) => command_encode(args, &formatter),
        Commands::Inspect { files } => command_inspect(files, &formatter),
        Commands::Genres => command_genres(&formatter),
    };

    if let Err(e) = result {
        formatter.print_error(&format!("{:#}", e));
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the level follows `--verbose`/`--quiet`.
fn init_tracing(config: &Config) {
    let default_level = if config.verbose {
        "debug"
    } else if config.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
