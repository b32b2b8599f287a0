//! Bridge connection state machine.
//!
//! `Disconnected → Connecting → Connected`, with `LoggedOut` terminal. The
//! event listener drives it; the dispatcher only observes the resulting
//! [`ConnectionState`] updates.

use std::fmt;

use serde::Serialize;

/// Where the link to WhatsApp currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live connection; a reconnect is pending.
    Disconnected,
    /// Polling the bridge, waiting for WhatsApp to open.
    Connecting,
    /// WhatsApp session open.
    Connected,
    /// Session revoked on the phone. Requires re-pairing; never left.
    LoggedOut,
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// Start (or restart) polling the bridge.
    Dial,
    /// The bridge reported an open WhatsApp session.
    Opened,
    /// The connection dropped.
    Closed {
        /// Whether WhatsApp logged the session out.
        logged_out: bool,
    },
}

impl ConnectionState {
    /// State after applying `signal`.
    pub fn next(self, signal: ConnectionSignal) -> Self {
        match (self, signal) {
            (Self::LoggedOut, _) => Self::LoggedOut,
            (_, ConnectionSignal::Closed { logged_out: true }) => Self::LoggedOut,
            (_, ConnectionSignal::Closed { logged_out: false }) => Self::Disconnected,
            (_, ConnectionSignal::Opened) => Self::Connected,
            (Self::Disconnected, ConnectionSignal::Dial) => Self::Connecting,
            (state, ConnectionSignal::Dial) => state,
        }
    }

    /// Returns `true` for the terminal state.
    pub fn is_terminal(self) -> bool {
        self == Self::LoggedOut
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::LoggedOut => "logged_out",
        })
    }
}
