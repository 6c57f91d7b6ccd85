//! Client session
//!
//! One `Session` per accepted connection. It registers its peer, offers
//! random topic pairs, forwards votes to the coordinator and runs the
//! idle-timeout and relapse timers on a fixed tick.

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::client::registry::ClientRegistry;
use crate::client::state::{SessionEnd, SessionTiming};
use crate::error::SessionError;
use crate::error::handlers::error_to_wire_tag;
use crate::poll::{TopicCatalog, TopicId, TopicPair, VoteCoordinator};
use crate::protocol::{FramedChannel, Request, Response, parse_request};

/// Shared collaborators handed to every session.
#[derive(Clone)]
pub struct SessionContext {
    pub catalog: Arc<TopicCatalog>,
    pub coordinator: Arc<dyn VoteCoordinator>,
    pub registry: Arc<ClientRegistry>,
    pub timing: SessionTiming,
}

/// A registered client connection.
///
/// `run` consumes the session, so the termination sequence happens once.
pub struct Session {
    peer: SocketAddr,
    ctx: SessionContext,
    cancel: CancellationToken,
    idle_ticks: u32,
    relapse_ticks: u64,
    offered: Option<TopicPair>,
    rng: StdRng,
}

impl Session {
    /// Registers `peer` with the client registry.
    ///
    /// Fails with `DuplicateConnection` if a client from the same address is
    /// already registered. Nothing has been sent in that case and the caller
    /// still owns the connection.
    ///
    /// On success the caller must hand the session to `run`: the registry
    /// entry is only released by its termination sequence.
    pub(crate) async fn new(
        peer: SocketAddr,
        ctx: SessionContext,
        cancel: CancellationToken,
    ) -> Result<Self, SessionError> {
        ctx.registry.try_register(peer).await?;

        Ok(Self {
            peer,
            ctx,
            cancel,
            idle_ticks: 0,
            relapse_ticks: 0,
            offered: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Topic pair most recently sent to the client.
    pub fn offered(&self) -> Option<TopicPair> {
        self.offered
    }

    /// Runs the handshake and tick loop until the session ends, then closes
    /// the channel and deregisters.
    pub async fn run<S>(mut self, mut channel: FramedChannel<S>) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!("Session started for {}", self.peer);

        let end = match self.drive(&mut channel).await {
            Ok(end) => end,
            Err(err) => {
                warn!("Session for {} failed: {}", self.peer, err);
                if let Some(response) = error_to_wire_tag(&err) {
                    if let Err(e) = send_marker(&mut channel, response).await {
                        debug!("Could not notify {} of {:?}: {}", self.peer, response, e);
                    }
                }
                SessionEnd::Errored(err)
            }
        };

        self.terminate(channel, &end).await;
        end
    }

    async fn drive<S>(&mut self, channel: &mut FramedChannel<S>) -> Result<SessionEnd, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.cancel.is_cancelled() {
            return Ok(SessionEnd::Cancelled);
        }
        self.handshake(channel).await?;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(SessionEnd::Cancelled);
            }
            if let Some(end) = self.tick(channel).await? {
                return Ok(end);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
                _ = tokio::time::sleep(self.ctx.timing.tick_interval) => {}
            }
        }
    }

    async fn handshake<S>(&mut self, channel: &mut FramedChannel<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let relapse_secs = i32::try_from(self.ctx.timing.relapse_period_secs).unwrap_or(i32::MAX);
        channel.write_int(relapse_secs).await?;
        channel.flush().await?;

        self.send_topics(channel).await
    }

    /// One pass of the state machine. Returns the terminal transition, if any.
    async fn tick<S>(
        &mut self,
        channel: &mut FramedChannel<S>,
    ) -> Result<Option<SessionEnd>, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if self.idle_ticks >= self.ctx.timing.idle_timeout_ticks {
            return Ok(Some(SessionEnd::TimedOut));
        }

        if self.relapse_ticks > self.ctx.timing.relapse_threshold() {
            debug!("Relapse for {}", self.peer);
            channel.write_int(Response::TimeRelapse.tag()).await?;
            self.send_topics(channel).await?;
            self.relapse_ticks = 0;
        } else if channel.available().await? {
            let Some(tag) = self.read_request_int(channel).await? else {
                return Ok(Some(SessionEnd::Cancelled));
            };

            match parse_request(tag) {
                Request::SelectionCompleted => {
                    let Some(selected) = self.read_request_int(channel).await? else {
                        return Ok(Some(SessionEnd::Cancelled));
                    };
                    self.record_vote(selected);
                    self.send_topics(channel).await?;
                    self.relapse_ticks = 0;
                }
                Request::RegularDisconnect => return Ok(Some(SessionEnd::Disconnected)),
                Request::Heartbeat => {}
                Request::Unknown(tag) => return Err(SessionError::ProtocolViolation(tag)),
            }

            self.idle_ticks = 0;
        } else {
            self.idle_ticks += 1;
        }

        self.relapse_ticks += 1;
        Ok(None)
    }

    /// Reads one int of a request. A request must complete within the idle
    /// window; `None` means cancellation was observed while waiting.
    async fn read_request_int<S>(
        &self,
        channel: &mut FramedChannel<S>,
    ) -> Result<Option<i32>, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let window = self.ctx.timing.idle_window();

        tokio::select! {
            _ = self.cancel.cancelled() => Ok(None),
            read = tokio::time::timeout(window, channel.read_int()) => match read {
                Ok(value) => Ok(Some(value?)),
                Err(_) => Err(SessionError::Transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("incomplete request after {:?}", window),
                ))),
            },
        }
    }

    /// Counts a vote only if it names one of the offered topics.
    fn record_vote(&self, selected: TopicId) {
        match self.offered {
            Some(pair) if pair.contains(selected) => {
                self.ctx.coordinator.increment_vote(selected);
                debug!("Vote from {} for topic {}", self.peer, selected);
            }
            _ => debug!(
                "Ignoring vote from {} for topic {} not on offer",
                self.peer, selected
            ),
        }
    }

    /// Draws a new pair and sends it, flushing after each field.
    async fn send_topics<S>(&mut self, channel: &mut FramedChannel<S>) -> Result<(), SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let pair = self.ctx.catalog.offer_pair(&mut self.rng);
        self.offered = Some(pair);

        channel.write_int(Response::UpdatePollData.tag()).await?;
        channel.flush().await?;
        for topic in [pair.first, pair.second] {
            channel.write_int(topic).await?;
            channel.flush().await?;
            channel
                .write_string(self.ctx.catalog.label(topic).unwrap_or_default())
                .await?;
            channel.flush().await?;
        }

        Ok(())
    }

    async fn terminate<S>(self, channel: FramedChannel<S>, end: &SessionEnd)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        channel.close().await;
        let remaining = self.ctx.registry.deregister(&self.peer).await;
        info!(
            "Client {} {} ({} clients remain)",
            self.peer, end, remaining
        );
    }
}

async fn send_marker<S>(channel: &mut FramedChannel<S>, response: Response) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    channel.write_int(response.tag()).await?;
    channel.flush().await
}
