//! `pact-harness`: runs a command or an interactive session against a
//! throwaway Pact mock service.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::SessionArgs;

#[derive(Parser)]
#[command(name = "pact-harness")]
#[command(about = "Run contract tests against a throwaway Pact mock service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session, run a command against it, then verify and stop
    Exec {
        #[command(flatten)]
        session: SessionArgs,

        /// Command to run; the mock service URL is in PACT_MOCK_SERVICE_URL
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Start a session and keep it up until Ctrl-C
    Up {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Verify interactions on an already running mock service
    Verify {
        /// Base URL of the mock service
        #[arg(long)]
        url: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Exec { session, command } => commands::exec::run(session, command).await,
        Commands::Up { session } => commands::up::run(session).await,
        Commands::Verify { url, timeout } => commands::verify::run(&url, timeout).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exec_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "pact-harness",
            "exec",
            "--fixture",
            "fixtures/one.json",
            "--fixture",
            "fixtures/two.json",
            "--",
            "cargo",
            "test",
            "--test",
            "contract",
        ])
        .unwrap();

        match cli.command {
            Commands::Exec { session, command } => {
                assert_eq!(session.fixtures.len(), 2);
                assert_eq!(command, vec!["cargo", "test", "--test", "contract"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Cli::try_parse_from(["pact-harness", "exec"]).is_err());
    }
}
