//! WakaTime CLI entry point.

use clap::Parser;
use wakatime::cli::{self, Cli, EntryPoint, EXIT_ERR_GENERIC};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::setup_logging(&cli) {
        eprintln!("failed to setup logging: {}", e);
        std::process::exit(EXIT_ERR_GENERIC);
    }

    let exit_code = EntryPoint::new().run(&cli);

    std::process::exit(exit_code);
}
