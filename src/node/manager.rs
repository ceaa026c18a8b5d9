//! Node process lifecycle.
//!
//! The docker variant shells out to `docker compose` so the indexer can bring
//! its node up and tear it down around its own lifetime. The noop variant is
//! for nodes managed elsewhere (and for the fake API, which has no process).

use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::{Config, NodeManagerKind};

#[derive(Debug)]
pub enum ManagerError {
    Spawn(std::io::Error),
    CommandFailed { command: String, stderr: String },
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerError::Spawn(e) => write!(f, "Failed to spawn docker compose: {}", e),
            ManagerError::CommandFailed { command, stderr } => {
                write!(f, "'{}' failed: {}", command, stderr.trim())
            }
        }
    }
}

impl std::error::Error for ManagerError {}

impl From<std::io::Error> for ManagerError {
    fn from(e: std::io::Error) -> Self {
        ManagerError::Spawn(e)
    }
}

#[async_trait]
pub trait NodeManager: Send + Sync {
    async fn start(&self) -> Result<(), ManagerError>;

    async fn stop(&self) -> Result<(), ManagerError>;
}

pub struct DockerNodeManager {
    compose_filepath: String,
}

impl DockerNodeManager {
    pub fn new(compose_filepath: String) -> Self {
        Self { compose_filepath }
    }

    async fn compose(&self, args: &[&str]) -> Result<(), ManagerError> {
        let output: Output = Command::new("docker")
            .arg("compose")
            .arg("-f")
            .arg(&self.compose_filepath)
            .args(args)
            .output()
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ManagerError::CommandFailed {
                command: format!("docker compose {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

#[async_trait]
impl NodeManager for DockerNodeManager {
    async fn start(&self) -> Result<(), ManagerError> {
        log::info!("Starting node via docker compose ({})", self.compose_filepath);
        self.compose(&["up", "--detach", "--remove-orphans"]).await
    }

    async fn stop(&self) -> Result<(), ManagerError> {
        log::info!("Stopping node via docker compose");
        self.compose(&["down", "--remove-orphans", "--volumes"])
            .await
    }
}

pub struct NoopNodeManager;

#[async_trait]
impl NodeManager for NoopNodeManager {
    async fn start(&self) -> Result<(), ManagerError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ManagerError> {
        Ok(())
    }
}

pub fn build_node_manager(config: &Config) -> Arc<dyn NodeManager> {
    match config.node_manager {
        NodeManagerKind::Docker => {
            // Presence of the compose path is validated at config load.
            let path = config.node_compose_filepath.clone().unwrap_or_default();
            Arc::new(DockerNodeManager::new(path))
        }
        NodeManagerKind::Noop => Arc::new(NoopNodeManager),
    }
}
