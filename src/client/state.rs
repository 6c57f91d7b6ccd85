//! Module `state`
//!
//! Timing parameters of the session loop and the ways a session can end.

use std::fmt;
use std::time::Duration;

use crate::error::SessionError;

/// Cadence and thresholds of the per-connection tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Seconds a pair stays offered without a vote; sent in the handshake.
    pub relapse_period_secs: u32,
    pub tick_interval: Duration,
    /// Consecutive ticks without an inbound message before timing out.
    pub idle_timeout_ticks: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            relapse_period_secs: 15,
            tick_interval: Duration::from_millis(10),
            idle_timeout_ticks: 100,
        }
    }
}

impl SessionTiming {
    /// Time a client may stay silent, also the limit for finishing a request.
    pub fn idle_window(&self) -> Duration {
        self.tick_interval * self.idle_timeout_ticks
    }

    /// Relapse fires once the relapse counter exceeds this many ticks.
    pub fn relapse_threshold(&self) -> u64 {
        let tick_ms = self.tick_interval.as_millis().max(1);
        let threshold = u128::from(self.relapse_period_secs) * 1000 / tick_ms;
        u64::try_from(threshold).unwrap_or(u64::MAX)
    }
}

/// Terminal transition of a session.
#[derive(Debug)]
pub enum SessionEnd {
    /// Client sent REGULAR_DISCONNECT
    Disconnected,
    /// No inbound message for the idle threshold
    TimedOut,
    /// Shutdown observed at a tick boundary
    Cancelled,
    Errored(SessionError),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Disconnected => write!(f, "disconnected"),
            SessionEnd::TimedOut => write!(f, "timed out"),
            SessionEnd::Cancelled => write!(f, "cancelled"),
            SessionEnd::Errored(e) => write!(f, "errored ({})", e),
        }
    }
}
