pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tripchat",
    about = "Tripchat operator CLI",
    long_about = "Apply migrations, inspect configuration, check readiness, and manage users and session tokens.",
    after_help = "Examples:\n  tripchat doctor --json\n  tripchat user-add --name Ana --email ana@example.com\n  tripchat issue-token --user-id <id>"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model settings, and database schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Register a user, reusing the existing one for a known external id")]
    UserAdd {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, help = "Identity provider subject, e.g. the OAuth `sub` claim")]
        external_id: Option<String>,
    },
    #[command(about = "Mint a signed session token for an existing user")]
    IssueToken {
        #[arg(long)]
        user_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::UserAdd { name, email, external_id } => {
            commands::user_add::run(&name, email.as_deref(), external_id.as_deref())
        }
        Command::IssueToken { user_id } => commands::issue_token::run(&user_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
