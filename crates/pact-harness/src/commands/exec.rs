use super::{print_report, SessionArgs};
use anyhow::{Context, Result};
use pact_mock_service::MockServiceSession;
use std::process::ExitCode;
use tokio::process::Command;
use tracing::info;

/// Environment variable carrying the mock service base URL
pub const URL_ENV: &str = "PACT_MOCK_SERVICE_URL";

pub async fn run(args: SessionArgs, command: Vec<String>) -> Result<ExitCode> {
    let (program, program_args) = command.split_first().context("No command given")?;
    let config = args.into_config()?;
    let session = MockServiceSession::start(config)
        .await
        .context("Failed to start mock service session")?;

    println!("Mock service ready at {}", session.url());

    // The session must be torn down whatever the command does
    info!("Running {} {}", program, program_args.join(" "));
    let status = Command::new(program)
        .args(program_args)
        .env(URL_ENV, session.url())
        .status()
        .await;

    let report = session.finish().await;
    let teardown_ok = print_report(&report);

    let status = status.with_context(|| format!("Failed to run {}", program))?;
    if !status.success() {
        eprintln!("✗ {} exited with {}", program, status);
        return Ok(ExitCode::FAILURE);
    }

    Ok(if teardown_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
