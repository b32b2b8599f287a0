//! WhatsApp adapter: HTTP bridge client, event listener, and connection state.
//!
//! Communicates with a baileys-based sidecar via HTTP and long-polling. The
//! sidecar owns session persistence, pairing and encryption; this side only
//! sends text and consumes events.

pub mod client;
pub mod connection;
pub mod events;

use async_trait::async_trait;

/// Errors from the WhatsApp adapter.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// HTTP request to the sidecar failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The sidecar is not running or not reachable.
    #[error("sidecar not running")]
    SidecarNotRunning,

    /// The sidecar rejected an outbound message.
    #[error("send failed ({status}): {body}")]
    SendFailed {
        /// HTTP status returned by the sidecar.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Outbound text channel to a chat.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send `text` to the conversation identified by `jid`.
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError>;
}
