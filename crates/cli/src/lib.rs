pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "warboard",
    about = "Warboard operator CLI",
    long_about = "Inspect and maintain the table reservation service: effective configuration, \
                  readiness checks, and the durable reservation record.",
    after_help = "Examples:\n  warboard doctor --json\n  warboard config\n  warboard view\n  warboard reset --yes"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token readiness, and reservation snapshot access")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List every active reservation from the durable record")]
    View,
    #[command(about = "Clear every reservation from the durable record")]
    Reset {
        #[arg(long, help = "Confirm clearing all reservations")]
        yes: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::View => commands::view::run(),
        Command::Reset { yes } => commands::reset::run(yes),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
