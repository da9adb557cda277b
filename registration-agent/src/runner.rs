use anyhow::{anyhow, Context, Result};
use pck_registration::registration::{RegistrationChecker, RemoteRegistrationClient, Scheduler};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::platform::StateDirPlatform;
use crate::status::StatusBoard;

type AgentScheduler = Scheduler<RegistrationChecker<StateDirPlatform>, StatusBoard>;

/// Top-level orchestrator for the registration agent.
pub struct Runner {
    scheduler: AgentScheduler,
    status: Arc<StatusBoard>,
    shutdown: CancellationToken,
}

impl Runner {
    pub fn builder(cfg: Config) -> RunnerBuilder {
        RunnerBuilder::from(cfg)
    }

    /// Runs the scheduler until a shutdown signal arrives or the loop exits.
    pub async fn run(self) -> Result<()> {
        tracing::debug!("starting runner");

        let Runner {
            scheduler,
            status,
            shutdown,
        } = self;

        let mut scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

        let exited_early = tokio::select! {
            _ = shutdown_signal() => {
                info!("shutdown signal received, exiting");
                None
            }
            res = &mut scheduler_handle => Some(res),
        };

        let joined = match exited_early {
            Some(res) => res,
            None => {
                shutdown.cancel();
                scheduler_handle.await
            }
        };

        if let Ok(snapshot) = status.snapshot() {
            info!(
                status = %snapshot.outcome,
                cycles = snapshot.cycles,
                "final registration status"
            );
        }

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("registration scheduler failed")),
            Err(e) => {
                error!(error = ?e, "registration scheduler task panicked");
                Err(anyhow::Error::new(e).context("registration scheduler task"))
            }
        }
    }
}

pub struct RunnerBuilder {
    cfg: Config,
    client: Option<RemoteRegistrationClient>,
    shutdown: CancellationToken,
}

impl RunnerBuilder {
    pub fn from(cfg: Config) -> Self {
        Self {
            cfg,
            client: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds the trusted HTTP transport. Trust-root problems are fatal here.
    pub fn build_client(mut self) -> Result<Self> {
        let client_cfg = self.cfg.client_config()?;
        let client = RemoteRegistrationClient::new(&client_cfg)
            .context("failed to create registration client")?;
        self.client = Some(client);
        Ok(self)
    }

    pub fn build(self) -> Result<Runner> {
        let client = self
            .client
            .ok_or_else(|| anyhow!("registration client not built"))?;

        let platform = StateDirPlatform::new(self.cfg.platform_state_dir.clone());
        let checker = RegistrationChecker::new(platform, client);
        let status = Arc::new(StatusBoard::new());
        let scheduler = Scheduler::new(checker, status.clone(), self.cfg.registration_interval());

        Ok(Runner {
            scheduler,
            status,
            shutdown: self.shutdown,
        })
    }
}

/// Blocks until Ctrl+C (or SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! { _ = ctrl_c => {}, _ = terminate => {}, }
}
