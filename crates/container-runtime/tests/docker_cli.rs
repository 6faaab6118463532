//! Tests for the Docker CLI orchestrator against a real daemon

#[cfg(feature = "docker-tests")]
mod tests {
    use container_runtime::{DockerCli, Error, LaunchSpec, Orchestrator};

    #[tokio::test]
    async fn test_launch_resolve_destroy() {
        let docker = DockerCli::new();
        let spec = LaunchSpec::new("nginx", "alpine")
            .with_exposed_port(80)
            .with_label("pact-mock-service", "docker-cli-test");

        let handle = docker.launch(&spec).await.expect("launch nginx");
        let address = docker.resolve_host_port(&handle, 80).unwrap();
        assert!(address.rsplit_once(':').is_some());

        docker.destroy(&handle).await.expect("destroy");
        // Removing a container that is already gone is not an error
        docker.destroy(&handle).await.expect("second destroy");
    }

    #[tokio::test]
    async fn test_launch_unknown_image() {
        let docker = DockerCli::new();
        let spec = LaunchSpec::new("pact-mock-service/does-not-exist", "never")
            .with_exposed_port(1234);

        match docker.launch(&spec).await {
            Err(Error::ImageNotFound { image }) => {
                assert_eq!(image, "pact-mock-service/does-not-exist:never")
            }
            other => panic!("expected ImageNotFound, got {other:?}"),
        }
    }
}
