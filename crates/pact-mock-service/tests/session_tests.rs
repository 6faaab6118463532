//! Session setup and teardown against stub backends

use mockito::{Matcher, Server};
use pact_mock_service::testing::{OrchestratorEvent, ScriptedOrchestrator};
use pact_mock_service::{
    AttachedBackend, ContainerBackend, Error, Fixture, MockServiceConfig, MockServiceSession,
    Operation, ReadinessProber, SessionState,
};
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_prober() -> ReadinessProber {
    ReadinessProber::new()
        .with_initial_interval(Duration::from_millis(5))
        .with_max_interval(Duration::from_millis(50))
        .with_max_elapsed(Duration::from_millis(500))
}

fn interaction(description: &str, path: &str) -> String {
    json!({
        "consumer": { "name": "a consumer" },
        "provider": { "name": "a provider" },
        "interactions": [{
            "description": description,
            "request": { "method": "get", "path": path },
            "response": { "status": 200 },
            "provider_state": "state one"
        }],
        "metadata": { "pactSpecification": { "version": "1.0" } }
    })
    .to_string()
}

fn attached(server: &Server) -> Arc<AttachedBackend> {
    Arc::new(AttachedBackend::new(server.url()).with_prober(fast_prober()))
}

/// Mock response body that appends `entry` to `log` when served
fn record(
    log: &Arc<Mutex<Vec<&'static str>>>,
    entry: &'static str,
) -> impl Fn(&mockito::Request) -> Vec<u8> + Send + Sync + 'static {
    let log = log.clone();
    move |_| {
        log.lock().unwrap().push(entry);
        Vec::new()
    }
}

#[tokio::test]
async fn test_setup_clears_then_loads_fixtures_in_order() {
    let mut server = Server::new_async().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let _root = server.mock("GET", "/").create_async().await;
    let delete = server
        .mock("DELETE", "/interactions")
        .with_status(200)
        .with_body_from_request(record(&log, "DELETE"))
        .create_async()
        .await;
    let first = server
        .mock("POST", "/interactions")
        .match_body(Matcher::PartialJsonString(interaction("one", "/path1")))
        .with_status(200)
        .with_body_from_request(record(&log, "POST one"))
        .create_async()
        .await;
    let second = server
        .mock("POST", "/interactions")
        .match_body(Matcher::PartialJsonString(interaction("two", "/path2")))
        .with_status(200)
        .with_body_from_request(record(&log, "POST two"))
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(interaction("one", "/path1").as_bytes()).unwrap();

    // Config fixtures load before builder fixtures
    let config = MockServiceConfig::default().with_fixture(file.path());
    let session = MockServiceSession::builder(config)
        .fixture(Fixture::bytes("two", interaction("two", "/path2")))
        .start_with(attached(&server))
        .await
        .unwrap();

    assert_eq!(session.url(), server.url());
    assert_eq!(session.state(), SessionState::Ready);
    delete.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(*log.lock().unwrap(), vec!["DELETE", "POST one", "POST two"]);

    let _verify = server
        .mock("GET", "/interactions/verification")
        .with_status(200)
        .create_async()
        .await;
    session.finish().await.into_result().unwrap();
}

#[tokio::test]
async fn test_builder_fixtures_load_in_insertion_order() {
    let mut server = Server::new_async().await;
    let log = Arc::new(Mutex::new(Vec::new()));
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .with_body_from_request(record(&log, "DELETE"))
        .create_async()
        .await;
    let mut creates = Vec::new();
    for (name, entry) in [("a", "POST a"), ("b", "POST b"), ("c", "POST c")] {
        let create = server
            .mock("POST", "/interactions")
            .match_body(Matcher::PartialJsonString(interaction(name, "/p")))
            .with_body_from_request(record(&log, entry))
            .create_async()
            .await;
        creates.push(create);
    }

    let session = MockServiceSession::builder(MockServiceConfig::default())
        .fixtures([
            Fixture::bytes("c", interaction("c", "/p")),
            Fixture::bytes("a", interaction("a", "/p")),
            Fixture::bytes("b", interaction("b", "/p")),
        ])
        .start_with(attached(&server))
        .await
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["DELETE", "POST c", "POST a", "POST b"]
    );

    let _verify = server
        .mock("GET", "/interactions/verification")
        .create_async()
        .await;
    session.finish().await.into_result().unwrap();
}

#[tokio::test]
async fn test_delete_failure_aborts_before_create() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    let create = server
        .mock("POST", "/interactions")
        .expect(0)
        .create_async()
        .await;

    let backend = attached(&server);
    let result = MockServiceSession::builder(MockServiceConfig::default())
        .fixture(Fixture::bytes("one", interaction("one", "/path1")))
        .start_with(backend.clone())
        .await;

    assert!(matches!(
        result,
        Err(Error::Protocol {
            operation: Operation::Delete,
            ..
        })
    ));
    create.assert_async().await;
    // Setup failures still release the backend
    assert!(!backend.is_attached().await);
}

#[tokio::test]
async fn test_first_failing_fixture_stops_loading() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;
    let rejected = server
        .mock("POST", "/interactions")
        .match_body(Matcher::PartialJsonString(interaction("one", "/path1")))
        .with_status(500)
        .with_body("duplicate interaction")
        .create_async()
        .await;
    let never = server
        .mock("POST", "/interactions")
        .match_body(Matcher::PartialJsonString(interaction("two", "/path2")))
        .expect(0)
        .create_async()
        .await;

    let backend = attached(&server);
    let result = MockServiceSession::builder(MockServiceConfig::default())
        .fixtures([
            Fixture::bytes("one", interaction("one", "/path1")),
            Fixture::bytes("two", interaction("two", "/path2")),
        ])
        .start_with(backend.clone())
        .await;

    match result {
        Err(Error::Protocol { body, .. }) => assert_eq!(body, "duplicate interaction"),
        Err(other) => panic!("expected protocol failure, got {other:?}"),
        Ok(_) => panic!("expected setup to fail"),
    }
    rejected.assert_async().await;
    never.assert_async().await;
    assert!(!backend.is_attached().await);
}

#[tokio::test]
async fn test_missing_fixture_file() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;

    let config = MockServiceConfig::default().with_fixture("/nonexistent/fixtures/simple.json");
    let backend = attached(&server);
    let result = MockServiceSession::builder(config)
        .start_with(backend.clone())
        .await;

    assert!(matches!(result, Err(Error::Fixture { .. })));
    assert!(!backend.is_attached().await);
}

#[tokio::test]
async fn test_teardown_stops_even_when_verification_fails() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;
    let _create = server
        .mock("POST", "/interactions")
        .create_async()
        .await;
    let _verify = server
        .mock("GET", "/interactions/verification")
        .with_status(500)
        .with_body("Missing requests:\n\tGET /path_one\n")
        .create_async()
        .await;

    let backend = attached(&server);
    let session = MockServiceSession::builder(MockServiceConfig::default())
        .fixture(Fixture::bytes("one", interaction("request one", "/path_one")))
        .start_with(backend.clone())
        .await
        .unwrap();
    assert!(backend.is_attached().await);

    let report = session.finish().await;

    assert!(report.shutdown.is_ok());
    let err = report.verification.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol {
            operation: Operation::Verify,
            ..
        }
    ));
    assert!(err.to_string().contains("GET /path_one"));
    assert!(!backend.is_attached().await);
}

#[tokio::test]
async fn test_container_session_lifecycle() {
    let mut server = Server::new_async().await;
    let root = server
        .mock("GET", "/")
        .with_status(404)
        .expect_at_least(1)
        .create_async()
        .await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;
    let _create = server
        .mock("POST", "/interactions")
        .create_async()
        .await;
    let _verify = server
        .mock("GET", "/interactions/verification")
        .create_async()
        .await;

    let orchestrator = Arc::new(ScriptedOrchestrator::new(server.host_with_port()));
    let config = MockServiceConfig::default();
    let backend = Arc::new(
        ContainerBackend::with_orchestrator(orchestrator.clone(), &config)
            .unwrap()
            .with_prober(fast_prober()),
    );

    let session = MockServiceSession::builder(config)
        .fixture(Fixture::bytes("one", interaction("request one", "/path_one")))
        .start_with(backend.clone())
        .await
        .unwrap();
    assert_eq!(session.url(), server.url());
    root.assert_async().await;

    session.finish().await.into_result().unwrap();
    assert!(!backend.is_running().await);
    assert_eq!(
        orchestrator.events(),
        vec![
            OrchestratorEvent::Launched("scripted-1".to_string()),
            OrchestratorEvent::Destroyed("scripted-1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_launch_failure_skips_probe() {
    let mut server = Server::new_async().await;
    let root = server.mock("GET", "/").expect(0).create_async().await;

    let orchestrator = Arc::new(ScriptedOrchestrator::new(server.host_with_port()));
    orchestrator.fail_launches(true);
    let config = MockServiceConfig::default();
    let backend = ContainerBackend::with_orchestrator(orchestrator.clone(), &config)
        .unwrap()
        .with_prober(fast_prober());

    let result = MockServiceSession::builder(config)
        .start_with(backend)
        .await;

    assert!(matches!(result, Err(Error::Launch(_))));
    root.assert_async().await;
    assert_eq!(orchestrator.launches(), 0);
}

#[tokio::test]
async fn test_teardown_reports_shutdown_failure() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let _delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;
    let _verify = server
        .mock("GET", "/interactions/verification")
        .with_status(500)
        .with_body("Missing requests")
        .create_async()
        .await;

    let orchestrator = Arc::new(ScriptedOrchestrator::new(server.host_with_port()));
    let config = MockServiceConfig::default();
    let backend = ContainerBackend::with_orchestrator(orchestrator.clone(), &config)
        .unwrap()
        .with_prober(fast_prober());

    let session = MockServiceSession::builder(config)
        .start_with(backend)
        .await
        .unwrap();

    orchestrator.fail_destroys(true);
    let report = session.finish().await;

    assert!(matches!(report.shutdown, Err(Error::Orchestrator(_))));
    assert!(matches!(
        report.into_result(),
        Err(Error::Teardown { .. })
    ));
    assert_eq!(
        orchestrator.events().last(),
        Some(&OrchestratorEvent::DestroyFailed("scripted-1".to_string()))
    );
}

#[tokio::test]
async fn test_start_attaches_when_base_url_configured() {
    let mut server = Server::new_async().await;
    let _root = server.mock("GET", "/").create_async().await;
    let delete = server
        .mock("DELETE", "/interactions")
        .create_async()
        .await;
    let _verify = server
        .mock("GET", "/interactions/verification")
        .create_async()
        .await;

    let mut config = MockServiceConfig::default().with_base_url(server.url());
    config.probe.initial_interval_ms = 5;

    let session = MockServiceSession::start(config).await.unwrap();
    assert_eq!(session.url(), server.url());
    delete.assert_async().await;

    session.verify().await.unwrap();
    session.finish().await.into_result().unwrap();
}

#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let config = MockServiceConfig {
        port: 0,
        ..Default::default()
    };
    assert!(matches!(
        MockServiceSession::start(config).await,
        Err(Error::Config(_))
    ));
}
