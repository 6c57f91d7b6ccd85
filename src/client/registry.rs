//! Client registry
//!
//! Tracks the currently connected clients, one per peer IP address. Every
//! change reports the new size to the coordinator while the lock is still
//! held, so the reported counts follow the exact order of changes.

use log::{info, warn};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::poll::VoteCoordinator;

/// A registered connection.
#[derive(Debug, Clone, Copy)]
pub struct ClientEntry {
    addr: SocketAddr,
    connected_at: Instant,
}

impl ClientEntry {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Registry for tracking active clients
pub struct ClientRegistry {
    clients: Mutex<HashMap<IpAddr, ClientEntry>>,
    coordinator: Arc<dyn VoteCoordinator>,
}

impl ClientRegistry {
    pub fn new(coordinator: Arc<dyn VoteCoordinator>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            coordinator,
        }
    }

    /// Registers `addr` unless a client from the same IP is already present.
    ///
    /// Returns the registry size after insertion.
    pub async fn try_register(&self, addr: SocketAddr) -> Result<usize, SessionError> {
        let mut clients = self.clients.lock().await;

        // Addresses compare by value; the port is ignored.
        if let Some(existing) = clients.get(&addr.ip()) {
            warn!(
                "Rejecting {}: {} is already connected",
                addr,
                existing.addr()
            );
            return Err(SessionError::DuplicateConnection(addr.ip()));
        }

        clients.insert(
            addr.ip(),
            ClientEntry {
                addr,
                connected_at: Instant::now(),
            },
        );
        let count = clients.len();
        self.coordinator.report_client_count(count);

        info!("Registered client {} ({} clients)", addr, count);
        Ok(count)
    }

    /// Removes `addr` and returns the registry size after removal.
    pub async fn deregister(&self, addr: &SocketAddr) -> usize {
        let mut clients = self.clients.lock().await;

        match clients.get(&addr.ip()).copied() {
            Some(entry) if entry.addr() == *addr => {
                info!(
                    "Deregistered client {} after {:?}",
                    addr,
                    entry.connected_for()
                );
                clients.remove(&addr.ip());
            }
            _ => warn!("Client {} was not registered", addr),
        }

        let count = clients.len();
        self.coordinator.report_client_count(count);
        count
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    pub async fn contains(&self, ip: IpAddr) -> bool {
        self.clients.lock().await.contains_key(&ip)
    }
}
