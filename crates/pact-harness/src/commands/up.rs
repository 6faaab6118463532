use super::{print_report, SessionArgs};
use anyhow::{Context, Result};
use pact_mock_service::MockServiceSession;
use std::process::ExitCode;

pub async fn run(args: SessionArgs) -> Result<ExitCode> {
    let config = args.into_config()?;
    let session = MockServiceSession::start(config)
        .await
        .context("Failed to start mock service session")?;

    println!("Mock service ready at {}", session.url());
    println!("Press Ctrl-C to verify and stop");

    let interrupted = tokio::signal::ctrl_c().await;

    let report = session.finish().await;
    let teardown_ok = print_report(&report);
    interrupted.context("Failed to listen for Ctrl-C")?;

    Ok(if teardown_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
