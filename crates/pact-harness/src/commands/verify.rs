use anyhow::Result;
use pact_mock_service::MockServiceClient;
use std::process::ExitCode;
use std::time::Duration;

pub async fn run(url: &str, timeout: u64) -> Result<ExitCode> {
    let client = MockServiceClient::new(url).with_timeout(Duration::from_secs(timeout));

    match client.verify().await {
        Ok(()) => {
            println!("✓ All interactions verified");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
