//! Local dev server lifecycle
//!
//! The server is started detached and never stopped by this crate; it is a
//! throwaway in-memory instance.

use crate::api::VaultApi;
use async_trait::async_trait;
use cloudlab_config::VaultSettings;
use cloudlab_core::{
    CommandRunner, HealthProbe, LabError, ProbeStatus, Reporter, Result, WaitConfig, wait_ready,
};
use std::path::{Path, PathBuf};

/// Probes the server's health endpoint
pub struct VaultHealthProbe<'a> {
    api: &'a dyn VaultApi,
    target: String,
}

impl<'a> VaultHealthProbe<'a> {
    pub fn new(api: &'a dyn VaultApi, settings: &VaultSettings) -> Self {
        Self {
            api,
            target: settings.health_url(),
        }
    }
}

#[async_trait]
impl HealthProbe for VaultHealthProbe<'_> {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn probe(&self) -> ProbeStatus {
        match self.api.health().await {
            Ok(status) if status.is_ready() => ProbeStatus::Ready,
            Ok(status) => ProbeStatus::NotReady(format!(
                "HTTP {} (initialized: {}, sealed: {})",
                status.status_code, status.initialized, status.sealed
            )),
            Err(e) => ProbeStatus::NotReady(e.to_string()),
        }
    }
}

/// How the server came to be available
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStart {
    /// Something was already answering on the configured address
    AlreadyRunning,
    Started { pid: u32, root_token: String },
}

impl ServerStart {
    /// Root token of a server started by this run
    pub fn root_token(&self) -> Option<&str> {
        match self {
            ServerStart::AlreadyRunning => None,
            ServerStart::Started { root_token, .. } => Some(root_token),
        }
    }
}

/// Path of the server binary, installing it first when it is not on PATH
pub async fn ensure_binary(
    runner: &dyn CommandRunner,
    settings: &VaultSettings,
    reporter: &dyn Reporter,
) -> Result<PathBuf> {
    if let Some(path) = runner.locate(&settings.binary).await? {
        tracing::debug!("Found {} at {}", settings.binary, path.display());
        return Ok(path);
    }

    let Some((program, args)) = settings.install_command.split_first() else {
        return Err(LabError::ToolNotFound(settings.binary.clone()));
    };
    reporter.info(&format!("Installing {}...", settings.binary));
    runner.run_checked(program, args).await?;

    runner
        .locate(&settings.binary)
        .await?
        .ok_or_else(|| LabError::ToolNotFound(settings.binary.clone()))
}

fn wait_config(settings: &VaultSettings) -> WaitConfig {
    WaitConfig {
        max_attempts: settings.poll_attempts,
        interval: settings.poll_interval(),
    }
}

/// Make sure a dev server answers on the configured address.
///
/// A server that already responds (even if not yet ready) is reused. Only a
/// refused connection leads to installing and starting a new one.
pub async fn start_dev_server(
    api: &dyn VaultApi,
    runner: &dyn CommandRunner,
    settings: &VaultSettings,
    reporter: &dyn Reporter,
) -> Result<ServerStart> {
    let probe = VaultHealthProbe::new(api, settings);

    match api.health().await {
        Ok(status) => {
            reporter.info(&format!("Vault already running at {}", settings.address));
            if !status.is_ready() {
                wait_ready(&probe, &wait_config(settings)).await?;
            }
            return Ok(ServerStart::AlreadyRunning);
        }
        Err(e) if e.is_connectivity() => {
            tracing::debug!("No server at {}: {}", settings.address, e);
        }
        Err(e) => return Err(e),
    }

    let binary = ensure_binary(runner, settings, reporter).await?;
    let root_token = settings
        .root_token
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let args = vec![
        "server".to_string(),
        "-dev".to_string(),
        format!("-dev-root-token-id={}", root_token),
        format!("-dev-listen-address={}", settings.listen_address()),
    ];
    let log_path = Path::new(&settings.log_path);
    let pid = runner
        .spawn_detached(&binary.to_string_lossy(), &args, log_path)
        .await?;
    reporter.info(&format!(
        "Started Vault dev server (pid {}, log {})",
        pid,
        log_path.display()
    ));

    let attempts = wait_ready(&probe, &wait_config(settings)).await?;
    tracing::info!("Vault ready after {} probe(s)", attempts);

    Ok(ServerStart::Started { pid, root_token })
}
