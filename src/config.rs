//! Server configuration
//!
//! Everything a running server needs, gathered in one value that `main`
//! builds from CLI flags and environment variables and hands to
//! [`AppState::from_config`](crate::api::AppState::from_config).

use std::{net::SocketAddr, path::PathBuf};

use crate::{
    error::{Result, SommelierError},
    pipeline::{ArtifactPipeline, Prediction},
    train::{TrainCommand, TrainMode},
};

/// Where predictions come from
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineSource {
    /// Fixed answer, no model needed
    Demo(Prediction),
    /// JSON model artifact, re-read on every request
    Artifact(PathBuf),
}

impl Default for PipelineSource {
    fn default() -> Self {
        Self::Artifact(PathBuf::from(ArtifactPipeline::DEFAULT_PATH))
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Prediction pipeline
    pub pipeline: PipelineSource,
    /// Optional directory with page overrides
    pub templates_dir: Option<PathBuf>,
    /// Training command
    pub train_command: TrainCommand,
    /// Training mode
    pub train_mode: TrainMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            pipeline: PipelineSource::default(),
            templates_dir: None,
            train_command: TrainCommand::default(),
            train_mode: TrainMode::default(),
        }
    }
}

impl ServerConfig {
    /// Parse `host:port` into a socket address
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the host is not an IP literal.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        addr.parse().map_err(|e| {
            SommelierError::InvalidConfiguration(format!("Invalid address {addr}: {e}"))
        })
    }

    /// Reject settings that cannot work before anything is started
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an unusable address or an empty
    /// training program.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        if self.train_command.program.trim().is_empty() {
            return Err(SommelierError::InvalidConfiguration(
                "training program must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
