//! procctl - run commands with explicit stream redirection

mod cli;
mod commands;
mod logging;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use commands::check_requirements;
use console::style;
use runner::{RunConfig, Target, run_command};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    let target = match cli.command {
        Commands::Check => {
            let ok = check_requirements();
            std::process::exit(if ok { 0 } else { 1 });
        }
        Commands::Run { program, args } => Target::Program { program, args },
        Commands::Shell { command } => Target::Shell(command),
        Commands::Pipeline { stages } => Target::Pipeline(stages),
    };

    let config = RunConfig {
        target,
        capture: cli.capture,
        merge: cli.merge,
        discard_err: cli.discard_err,
        cwd: cli.cwd,
        env: cli.env,
        clear_env: cli.clear_env,
        binary: cli.binary,
        chomp: !cli.no_chomp,
        encoding: cli.encoding,
        json: cli.json,
    };

    match run_command(config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}
