use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::client::{ClientRegistry, SessionContext, handle_client};
use crate::config::ServerConfig;
use crate::error::{PollServerError, SessionError};
use crate::poll::{PollCoordinator, TopicCatalog};

pub struct Server {
    listener: TcpListener,
    ctx: SessionContext,
    coordinator: Arc<PollCoordinator>,
    stats_interval: Option<Duration>,
}

impl Server {
    /// Builds the shared poll state and binds the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self, PollServerError> {
        let catalog = Arc::new(TopicCatalog::new(config.topic_entries())?);
        let coordinator = Arc::new(PollCoordinator::new());
        let registry = Arc::new(ClientRegistry::new(coordinator.clone()));

        let socket = config.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e.into());
            }
        };

        info!(
            "Offering {} topics, relapse every {}s",
            catalog.len(),
            config.relapse_period_secs
        );

        Ok(Self {
            listener,
            ctx: SessionContext {
                catalog,
                coordinator: coordinator.clone(),
                registry,
                timing: config.session_timing(),
            },
            coordinator,
            stats_interval: config.stats_interval(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn coordinator(&self) -> Arc<PollCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.ctx.registry)
    }

    /// Accepts connections until `shutdown` is cancelled, then waits for
    /// every session to finish its termination sequence.
    pub async fn run(self, shutdown: CancellationToken) {
        let tracker = TaskTracker::new();

        if let Some(interval) = self.stats_interval {
            tracker.spawn(log_tally(
                Arc::clone(&self.coordinator),
                interval,
                shutdown.clone(),
            ));
        }

        info!("Accepting poll clients on {:?}", self.listener.local_addr());

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let ctx = self.ctx.clone();
                        let cancel = shutdown.child_token();

                        // Spawn a task for each client so accept loop doesn't block
                        tracker.spawn(async move {
                            match handle_client(stream, addr, ctx, cancel).await {
                                Ok(end) => info!("Session for {} ended: {}", addr, end),
                                Err(SessionError::DuplicateConnection(ip)) => {
                                    info!("Closed duplicate connection {} ({} already connected)", addr, ip)
                                }
                                Err(e) => warn!("Failed to handle client {}: {}", addr, e),
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                }
            }
        }

        info!("Shutting down, waiting for {} sessions", tracker.len());
        tracker.close();
        tracker.wait().await;
        info!("All sessions closed");
    }
}

async fn log_tally(coordinator: Arc<PollCoordinator>, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                info!(
                    "{} clients, {} votes: {:?}",
                    coordinator.client_count(),
                    coordinator.total_votes(),
                    coordinator.tally()
                );
            }
        }
    }
}
