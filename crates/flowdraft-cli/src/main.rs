//! Main application entry point (native).

use clap::Parser;
use flowdraft_cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("Running {:?}", cli.command);

    match pollster::block_on(flowdraft_cli::run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
