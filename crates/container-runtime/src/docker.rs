//! Orchestrator backed by the `docker` command line client.

use crate::spec::short_id;
use crate::{ContainerHandle, Error, LaunchSpec, Orchestrator, PortBinding, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_PROGRAM: &str = "docker";
const CONTAINER_NAME_PREFIX: &str = "pact-mock";

/// Captured result of one CLI invocation
#[derive(Debug)]
struct CommandOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs containers through the `docker` CLI
///
/// Published ports are looked up once, right after the container starts, and
/// stored in the [`ContainerHandle`]. Resolving an address later is therefore
/// free of I/O.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    advertised_host: String,
}

impl DockerCli {
    /// Use `docker` from `PATH`, advertising the host named by `DOCKER_HOST`
    pub fn new() -> Self {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            advertised_host: advertised_host(docker_host.as_deref()),
        }
    }

    /// Use a different client binary (e.g. `podman`)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Host substituted for wildcard bind addresses
    pub fn with_advertised_host(mut self, host: impl Into<String>) -> Self {
        self.advertised_host = host.into();
        self
    }

    async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        debug!("Running: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| Error::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    async fn lookup_port(&self, id: &str, port: u16) -> Result<PortBinding> {
        let args = vec!["port".to_string(), id.to_string(), format!("{port}/tcp")];
        let output = self.run(&args).await?;

        if !output.success() {
            return Err(Error::command_failed(
                format!("{} {}", self.program, args.join(" ")),
                output.code,
                output.stderr,
            ));
        }

        parse_port_output(&output.stdout).ok_or_else(|| Error::PortNotPublished {
            id: id.to_string(),
            port,
        })
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let args = vec![
            "rm".to_string(),
            "-f".to_string(),
            "-v".to_string(),
            id.to_string(),
        ];
        let output = self.run(&args).await?;

        if output.success() {
            return Ok(());
        }
        if output.stderr.contains("No such container") {
            info!("Container {} not found, nothing to remove", short_id(id));
            return Ok(());
        }

        Err(Error::command_failed(
            format!("{} {}", self.program, args.join(" ")),
            output.code,
            output.stderr,
        ))
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Orchestrator for DockerCli {
    async fn launch(&self, spec: &LaunchSpec) -> Result<ContainerHandle> {
        let image = spec.image();
        let name = format!("{}-{}", CONTAINER_NAME_PREFIX, uuid::Uuid::new_v4().simple());

        let mut args = vec![
            "run".to_string(),
            "-d".to_string(), // Detached mode
            "--name".to_string(),
            name.clone(),
        ];
        for (key, value) in &spec.labels {
            args.extend(["--label".to_string(), format!("{key}={value}")]);
        }
        // Publish on an ephemeral host port
        for port in &spec.exposed_ports {
            args.extend(["-p".to_string(), port.to_string()]);
        }
        args.push(image.clone());
        args.extend(spec.cmd.iter().cloned());

        info!("Launching container {} from {}", name, image);
        let output = self.run(&args).await?;

        if !output.success() {
            if is_missing_image(&output.stderr) {
                return Err(Error::ImageNotFound { image });
            }
            return Err(Error::command_failed(
                format!("{} run {}", self.program, image),
                output.code,
                output.stderr,
            ));
        }

        let id = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .next_back()
            .ok_or_else(|| Error::UnexpectedOutput("docker run printed no container id".into()))?
            .to_string();

        let mut handle = ContainerHandle::new(id, name);
        for &port in &spec.exposed_ports {
            match self.lookup_port(&handle.id, port).await {
                Ok(binding) => {
                    debug!(
                        "Container {} publishes {}/tcp on {}:{}",
                        handle.short_id(),
                        port,
                        binding.host_ip,
                        binding.host_port
                    );
                    handle = handle.with_port(port, binding);
                }
                Err(e) => {
                    // Don't leave a container behind that nobody holds a handle to
                    if let Err(cleanup) = self.remove(&handle.id).await {
                        warn!(
                            "Failed to remove container {} after port lookup error: {}",
                            handle.short_id(),
                            cleanup
                        );
                    }
                    return Err(e);
                }
            }
        }

        info!("Started container {} ({})", handle.name, handle.short_id());
        Ok(handle)
    }

    fn resolve_host_port(&self, handle: &ContainerHandle, internal_port: u16) -> Result<String> {
        let binding = handle
            .ports
            .get(&internal_port)
            .ok_or_else(|| Error::PortNotPublished {
                id: handle.id.clone(),
                port: internal_port,
            })?;

        let host = if is_wildcard(&binding.host_ip) {
            self.advertised_host.as_str()
        } else {
            binding.host_ip.as_str()
        };

        if host.contains(':') {
            Ok(format!("[{}]:{}", host, binding.host_port))
        } else {
            Ok(format!("{}:{}", host, binding.host_port))
        }
    }

    async fn destroy(&self, handle: &ContainerHandle) -> Result<()> {
        info!("Removing container {} ({})", handle.name, handle.short_id());
        self.remove(&handle.id).await
    }
}

/// Host to advertise for wildcard bindings given a `DOCKER_HOST` value
fn advertised_host(docker_host: Option<&str>) -> String {
    docker_host
        .and_then(|value| value.strip_prefix("tcp://"))
        .and_then(|rest| {
            let authority = rest.split('/').next().unwrap_or(rest);
            let host = match authority.rsplit_once(':') {
                Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
                _ => authority,
            };
            let host = host.trim_start_matches('[').trim_end_matches(']');
            (!host.is_empty()).then(|| host.to_string())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

fn is_wildcard(ip: &str) -> bool {
    matches!(ip, "" | "0.0.0.0" | "::" | "[::]")
}

fn is_missing_image(stderr: &str) -> bool {
    stderr.contains("pull access denied")
        || stderr.contains("manifest unknown")
        || stderr.contains("not found: manifest")
        || (stderr.contains("Unable to find image") && stderr.contains("Error response from daemon"))
}

/// Parse `docker port` output (format: `0.0.0.0:49153` / `[::]:49153`),
/// preferring an IPv4 binding
fn parse_port_output(output: &str) -> Option<PortBinding> {
    let mut bindings = output.lines().filter_map(|line| {
        let (host, port) = line.trim().rsplit_once(':')?;
        let host_port = port.parse::<u16>().ok()?;
        Some(PortBinding {
            host_ip: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            host_port,
        })
    });

    let first = bindings.next()?;
    if !first.host_ip.contains(':') {
        return Some(first);
    }
    bindings
        .find(|b| !b.host_ip.contains(':'))
        .or(Some(first))
}
