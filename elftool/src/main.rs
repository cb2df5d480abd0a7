use std::process::ExitCode;

use clap::Parser;
use elfcommon::{errorln, hintln};
use error_stack::Result;

mod cli;
mod cmd_check;
mod cmd_dump;
mod config;
mod error;

use cli::{Cli, Command};
use error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.apply_print_options();
    if let Err(e) = main_internal(&cli) {
        if cli.is_trace_on() {
            eprintln!("error: {:?}", e);
        } else {
            errorln!("Fatal", "{}", e);
            hintln!("Consider", "Run with `--trace` to see the full error report");
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_internal(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::Dump(options) => cmd_dump::run(&cli.top, options),
        Command::Check(options) => cmd_check::run(&cli.top, options),
    }
}
