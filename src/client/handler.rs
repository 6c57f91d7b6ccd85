use log::{debug, info, warn};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::client::session::{Session, SessionContext};
use crate::client::state::SessionEnd;
use crate::error::SessionError;
use crate::protocol::FramedChannel;

/// Handles one accepted connection from registration to termination.
///
/// - Rejects the connection, closing it untouched, if its address is
///   already registered.
/// - Otherwise runs the session until it disconnects, fails, times out or
///   observes `cancel`.
pub async fn handle_client(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    ctx: SessionContext,
    cancel: CancellationToken,
) -> Result<SessionEnd, SessionError> {
    let session = match Session::new(client_addr, ctx, cancel).await {
        Ok(session) => session,
        Err(e) => {
            if let Err(err) = stream.shutdown().await {
                debug!("Failed to close rejected connection {}: {}", client_addr, err);
            }
            return Err(e);
        }
    };

    // Every field is flushed on its own; don't let Nagle hold them back.
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY for {}: {}", client_addr, e);
    }

    info!("Accepted client {}", client_addr);
    Ok(session.run(FramedChannel::new(stream)).await)
}
