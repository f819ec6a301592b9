//! The session root: one parent process, its co-launched VFS server, and
//! its broker.
//!
//! All per-session singletons (the server connection, the injected set, the
//! quota) are owned here and passed down; there are no ambient globals, so
//! tests can run several independent sessions side by side.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use crate::broker::{Broker, Provider};
use crate::client::{Client, ClientError, Connection};
use crate::config::{Config, ConfigError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("spawn vfsd: {0}")]
    Spawn(std::io::Error),
    #[error("vfsd connection: {0}")]
    Connect(#[from] ClientError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which files the user injected, split by direction.
#[derive(Debug, Clone, Default)]
pub struct InjectedFiles {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl InjectedFiles {
    /// Every injected path, both directions.
    pub fn all(&self) -> Vec<PathBuf> {
        self.inputs.iter().chain(self.outputs.iter()).cloned().collect()
    }
}

/// One live session. Dropping it closes the connection; the server observes
/// EOF and exits, freeing every handle.
pub struct Session {
    child: tokio::process::Child,
    client: Client,
    broker: Broker,
    session_id: String,
}

impl Session {
    /// Launch `vfsd` with the injected files as its allowlists and wire up
    /// the single client connection over the child's stdio.
    pub async fn spawn(
        vfsd: &Path,
        config: &Config,
        injected: InjectedFiles,
        provider: Arc<dyn Provider>,
    ) -> Result<Self, SessionError> {
        let session_id = new_session_id();

        let mut cmd = tokio::process::Command::new(vfsd);
        for input in &injected.inputs {
            cmd.arg("-i").arg(input);
        }
        for output in &injected.outputs {
            cmd.arg("-o").arg(output);
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(SessionError::Spawn)?;
        let stdin = child.stdin.take().ok_or_else(missing_pipe)?;
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        debug!(session = %session_id, "vfsd spawned");

        let client = Client::new(Connection::new(stdout, stdin), injected.all(), true);
        client.ping().await?;

        let broker = Broker::new(
            config.broker_settings(),
            config.catalog()?,
            provider,
            session_id.clone(),
        );

        info!(session = %session_id, "session ready");
        Ok(Self { child, client, broker, session_id })
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Close outstanding handles and reap the server.
    pub async fn shutdown(mut self) -> Result<(), SessionError> {
        self.client.close_all().await;
        drop(self.client);
        // the dropped connection is the server's EOF
        let status = self.child.wait().await?;
        debug!(session = %self.session_id, %status, "vfsd exited");
        Ok(())
    }
}

fn missing_pipe() -> SessionError {
    SessionError::Spawn(std::io::Error::other("child stdio pipes were not captured"))
}

fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("sess-{}-{nanos:09}", std::process::id())
}
