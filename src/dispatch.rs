//! Event dispatch: one task per inbound message, ordered per sender.
//!
//! Each message gets its own Tokio task so a slow store call holds up only
//! that conversation. Tasks for the same sender are chained: a new task
//! waits for the sender's previous one before replying, so replies go out
//! in the order the commands arrived.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handler::MessageHandler;
use crate::whatsapp::connection::ConnectionState;
use crate::whatsapp::events::WhatsAppEvent;
use crate::whatsapp::MessageSink;

/// Finished chains are pruned once this many senders are tracked.
const PRUNE_THRESHOLD: usize = 256;

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown future resolved.
    Shutdown,
    /// The event channel closed.
    StreamClosed,
    /// WhatsApp logged the session out.
    LoggedOut,
}

/// Spawns reply tasks and keeps them ordered per sender.
pub struct Dispatcher {
    handler: Arc<MessageHandler>,
    sink: Arc<dyn MessageSink>,
    chains: HashMap<String, JoinHandle<()>>,
}

impl Dispatcher {
    /// Create a dispatcher replying through `sink`.
    pub fn new(handler: Arc<MessageHandler>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            handler,
            sink,
            chains: HashMap::new(),
        }
    }

    /// Spawn the reply task for one message.
    pub fn dispatch(&mut self, jid: &str, text: &str) {
        let previous = self.chains.remove(jid);
        let handler = Arc::clone(&self.handler);
        let sink = Arc::clone(&self.sink);
        let sender = jid.to_owned();
        let text = text.to_owned();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!(jid = %sender, error = %e, "previous reply task failed");
                }
            }
            reply(&handler, sink.as_ref(), &sender, &text).await;
        });
        self.chains.insert(jid.to_owned(), handle);

        if self.chains.len() > PRUNE_THRESHOLD {
            self.chains.retain(|_, handle| !handle.is_finished());
        }
    }

    /// Number of senders with a tracked reply chain.
    pub fn pending_senders(&self) -> usize {
        self.chains.values().filter(|h| !h.is_finished()).count()
    }

    /// Wait up to `timeout` for every in-flight reply.
    pub async fn drain(self, timeout: Duration) {
        let handles: Vec<JoinHandle<()>> = self.chains.into_values().collect();
        if handles.is_empty() {
            return;
        }
        info!(
            pending = handles.len(),
            timeout_secs = timeout.as_secs(),
            "waiting for in-flight replies"
        );
        let wait = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "reply task failed during drain");
                }
            }
        };
        if tokio::time::timeout(timeout, wait).await.is_err() {
            warn!("shutdown timeout exceeded, abandoning in-flight replies");
        }
    }
}

async fn reply(handler: &MessageHandler, sink: &dyn MessageSink, jid: &str, text: &str) {
    if let Some(welcome) = handler.welcome_for(jid).await {
        if let Err(e) = sink.send_text(jid, &welcome).await {
            warn!(jid, error = %e, "failed to send welcome message");
        }
    }

    let answer = handler.handle_inbound_message(jid, text).await;
    if let Err(e) = sink.send_text(jid, &answer).await {
        warn!(jid, error = %e, "failed to send reply");
    }
}

/// Consume events until shutdown, stream end, or logout, then drain.
pub async fn run(
    mut dispatcher: Dispatcher,
    mut events: mpsc::Receiver<WhatsAppEvent>,
    shutdown: impl Future<Output = ()>,
    drain_timeout: Duration,
) -> RunOutcome {
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    info!("WhatsApp event channel closed");
                    break RunOutcome::StreamClosed;
                };

                if let Some((jid, text)) = event.inbound_text() {
                    debug!(jid, "inbound message");
                    dispatcher.dispatch(jid, text);
                    continue;
                }

                match event {
                    WhatsAppEvent::ConnectionUpdate { state: ConnectionState::LoggedOut, error } => {
                        error!(?error, "WhatsApp logged out");
                        break RunOutcome::LoggedOut;
                    }
                    WhatsAppEvent::ConnectionUpdate { state, error } => {
                        info!(%state, ?error, "WhatsApp connection update");
                    }
                    WhatsAppEvent::Message { jid, from_me, .. } => {
                        debug!(%jid, from_me, "ignoring message without inbound text");
                    }
                }
            }
            () = &mut shutdown => {
                info!("received shutdown signal");
                break RunOutcome::Shutdown;
            }
        }
    };

    dispatcher.drain(drain_timeout).await;
    outcome
}
