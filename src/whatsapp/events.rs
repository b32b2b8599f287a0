//! Event listener for the WhatsApp bridge.
//!
//! Long-polls the sidecar's `/events/poll` endpoint, drives the
//! [`ConnectionState`] machine, and forwards [`WhatsAppEvent`]s over an mpsc
//! channel. Transport errors reconnect with exponential backoff; a logout
//! ends the listener.

use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::connection::{ConnectionSignal, ConnectionState};

/// Long-poll timeout for the HTTP client (seconds).
const POLL_TIMEOUT_SECS: u64 = 60;

/// First reconnect delay (milliseconds).
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum reconnect backoff (milliseconds).
const MAX_BACKOFF_MS: u64 = 30_000;

/// Pause after a non-200 or undecodable poll response (milliseconds).
const BAD_RESPONSE_DELAY_MS: u64 = 5000;

/// An event as delivered by the sidecar.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A message was received (or sent by us).
    Message {
        /// WhatsApp JID of the conversation.
        jid: String,
        /// Text content; absent for media and other non-text messages.
        text: Option<String>,
        /// Whether this message was sent by us.
        #[serde(default)]
        from_me: bool,
    },
    /// WhatsApp connection established.
    Connected,
    /// WhatsApp connection lost.
    Disconnected {
        /// Human-readable reason, if available.
        reason: Option<String>,
        /// Whether the session was logged out on the phone.
        #[serde(default)]
        logged_out: bool,
    },
    /// Any other bridge event (QR codes, receipts, presence). Ignored.
    #[serde(other)]
    Other,
}

/// Event forwarded to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhatsAppEvent {
    /// An inbound or self-sent message.
    Message {
        /// WhatsApp JID of the conversation.
        jid: String,
        /// Text content, if any.
        text: Option<String>,
        /// Whether this message was sent by us.
        from_me: bool,
    },
    /// The connection state changed.
    ConnectionUpdate {
        /// New state.
        state: ConnectionState,
        /// Error or reason that caused the change.
        error: Option<String>,
    },
}

impl WhatsAppEvent {
    /// Sender and text of a message worth answering.
    ///
    /// Returns `None` for connection updates, self-sent messages, and
    /// messages without text.
    pub fn inbound_text(&self) -> Option<(&str, &str)> {
        match self {
            Self::Message {
                jid,
                text: Some(text),
                from_me: false,
            } if !text.trim().is_empty() => Some((jid.as_str(), text.as_str())),
            _ => None,
        }
    }
}

/// Why the listener stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    ReceiverGone,
    LoggedOut,
}

/// Connection state plus the channel its updates go to.
struct Link {
    state: ConnectionState,
    tx: mpsc::Sender<WhatsAppEvent>,
}

impl Link {
    fn new(tx: mpsc::Sender<WhatsAppEvent>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            tx,
        }
    }

    /// Apply a signal, forwarding an update if the state changed.
    async fn apply(&mut self, signal: ConnectionSignal, error: Option<String>) -> Option<Stop> {
        let next = self.state.next(signal);
        if next == self.state {
            return None;
        }
        info!(from = %self.state, to = %next, "WhatsApp connection state changed");
        self.state = next;
        self.forward(WhatsAppEvent::ConnectionUpdate { state: next, error })
            .await
    }

    async fn forward(&self, event: WhatsAppEvent) -> Option<Stop> {
        self.tx.send(event).await.err().map(|_| Stop::ReceiverGone)
    }

    async fn handle(&mut self, event: BridgeEvent) -> Option<Stop> {
        match event {
            BridgeEvent::Message {
                jid,
                text,
                from_me,
            } => {
                self.forward(WhatsAppEvent::Message {
                    jid,
                    text,
                    from_me,
                })
                .await
            }
            BridgeEvent::Connected => self.apply(ConnectionSignal::Opened, None).await,
            BridgeEvent::Disconnected { reason, logged_out } => {
                if let Some(stop) = self
                    .apply(ConnectionSignal::Closed { logged_out }, reason)
                    .await
                {
                    return Some(stop);
                }
                if self.state.is_terminal() {
                    return Some(Stop::LoggedOut);
                }
                // The bridge redials WhatsApp on its own; keep polling.
                self.apply(ConnectionSignal::Dial, None).await
            }
            BridgeEvent::Other => None,
        }
    }
}

/// Spawn an event listener that forwards events to the given channel.
///
/// Returns immediately. The listener runs as a background Tokio task until
/// the receiver is dropped or WhatsApp logs the session out.
pub fn spawn_event_listener(
    base_url: String,
    event_tx: mpsc::Sender<WhatsAppEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let client = match reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(POLL_TIMEOUT_SECS))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "failed to build event poll client");
                return;
            }
        };
        let poll_url = format!("{}/events/poll", base_url.trim_end_matches('/'));
        let mut link = Link::new(event_tx);
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            if link.apply(ConnectionSignal::Dial, None).await.is_some() {
                break;
            }
            info!(url = %poll_url, "polling WhatsApp event stream");

            match poll_events(&client, &poll_url, &mut link, &mut backoff_ms).await {
                Ok(Stop::ReceiverGone) => {
                    info!("event receiver dropped, stopping WhatsApp listener");
                    break;
                }
                Ok(Stop::LoggedOut) => {
                    error!("WhatsApp session logged out, re-pair the bridge to continue");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, backoff_ms, "WhatsApp event stream error, reconnecting");
                    let closed = ConnectionSignal::Closed { logged_out: false };
                    if link.apply(closed, Some(e.to_string())).await.is_some() {
                        break;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
                    backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                }
            }
        }
    })
}

/// Poll the sidecar until the listener must stop. Returns `Err` on
/// non-timeout network errors so the caller can reconnect with backoff.
async fn poll_events(
    client: &reqwest::Client,
    poll_url: &str,
    link: &mut Link,
    backoff_ms: &mut u64,
) -> Result<Stop, reqwest::Error> {
    loop {
        match client.get(poll_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let events = match resp.json::<Vec<BridgeEvent>>().await {
                    Ok(events) => events,
                    Err(e) if e.is_decode() => {
                        warn!(error = %e, "undecodable event batch");
                        tokio::time::sleep(std::time::Duration::from_millis(BAD_RESPONSE_DELAY_MS))
                            .await;
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                for event in events {
                    debug!(?event, "received WhatsApp event");
                    if let Some(stop) = link.handle(event).await {
                        return Ok(stop);
                    }
                }
                if link.state == ConnectionState::Connected {
                    *backoff_ms = INITIAL_BACKOFF_MS;
                }
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "event poll returned non-200");
                tokio::time::sleep(std::time::Duration::from_millis(BAD_RESPONSE_DELAY_MS)).await;
            }
            Err(e) if e.is_timeout() => {
                // Long-poll window expired with no events.
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}
