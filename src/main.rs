// Entrypoint: parse flags, set up logging, run the requested action.
// Any error is logged with its context chain and exits with status 1.

use clap::Parser;
use gosend_cli::{actions, cli::Cli};
use tracing::{error, Level};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = actions::run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
