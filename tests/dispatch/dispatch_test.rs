//! Tests for `dispatch::run` and per-sender ordering.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use toolrent::dispatch::{run, Dispatcher, RunOutcome};
use toolrent::greeting::Greeter;
use toolrent::handler::MessageHandler;
use toolrent::inventory::service::InventoryService;
use toolrent::inventory::store::SqliteToolStore;
use toolrent::inventory::{Pricing, Tool, ToolStatus};
use toolrent::whatsapp::connection::ConnectionState;
use toolrent::whatsapp::events::WhatsAppEvent;
use toolrent::whatsapp::{MessageSink, WhatsAppError};

/// Records sent messages; optionally stalls the first send.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
    calls: AtomicUsize,
    stall_first: Option<Duration>,
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(delay) = self.stall_first {
                tokio::time::sleep(delay).await;
            }
        }
        self.sent.lock().await.push((jid.to_owned(), text.to_owned()));
        Ok(())
    }
}

/// Sink that always fails.
struct BrokenSink;

#[async_trait]
impl MessageSink for BrokenSink {
    async fn send_text(&self, _jid: &str, _text: &str) -> Result<(), WhatsAppError> {
        Err(WhatsAppError::SidecarNotRunning)
    }
}

/// Sink whose sends panic, killing the reply task.
struct PanickingSink;

#[async_trait]
impl MessageSink for PanickingSink {
    async fn send_text(&self, _jid: &str, _text: &str) -> Result<(), WhatsAppError> {
        panic!("sink exploded");
    }
}

async fn setup_handler() -> MessageHandler {
    let store = SqliteToolStore::in_memory()
        .await
        .expect("in-memory store should open");
    store
        .upsert(
            &Tool::new(
                "UnlockTool",
                ToolStatus::Available,
                Pricing::Flat {
                    price: 20.0,
                    duration_minutes: Some(30),
                },
            ),
            true,
        )
        .await
        .expect("seed");
    MessageHandler::new(InventoryService::new(Arc::new(store)))
}

fn message(jid: &str, text: &str) -> WhatsAppEvent {
    WhatsAppEvent::Message {
        jid: jid.to_owned(),
        text: Some(text.to_owned()),
        from_me: false,
    }
}

async fn run_events(
    handler: MessageHandler,
    sink: Arc<RecordingSink>,
    events: Vec<WhatsAppEvent>,
) -> RunOutcome {
    let (tx, rx) = mpsc::channel(16);
    for event in events {
        tx.send(event).await.expect("channel open");
    }
    drop(tx);

    let dispatcher = Dispatcher::new(Arc::new(handler), sink);
    run(
        dispatcher,
        rx,
        std::future::pending::<()>(),
        Duration::from_secs(5),
    )
    .await
}

#[tokio::test]
async fn replies_to_one_sender_keep_command_order() {
    let sink = Arc::new(RecordingSink {
        stall_first: Some(Duration::from_millis(150)),
        ..RecordingSink::default()
    });
    let outcome = run_events(
        setup_handler().await,
        Arc::clone(&sink),
        vec![
            message("alice", "/UnlockTool_status"),
            message("alice", "/rent_tool UnlockTool"),
            message("alice", "/UnlockTool_status"),
        ],
    )
    .await;
    assert_eq!(outcome, RunOutcome::StreamClosed);

    let sent = sink.sent.lock().await;
    assert_eq!(sent.len(), 3);
    assert!(sent[0].1.contains("Available"));
    assert!(sent[1].1.contains("You rented"));
    assert!(sent[2].1.contains("In Use"));
}

#[tokio::test]
async fn self_sent_and_textless_messages_are_ignored() {
    let sink = Arc::new(RecordingSink::default());
    run_events(
        setup_handler().await,
        Arc::clone(&sink),
        vec![
            WhatsAppEvent::Message {
                jid: "me".to_owned(),
                text: Some("/tool_rental".to_owned()),
                from_me: true,
            },
            WhatsAppEvent::Message {
                jid: "bob".to_owned(),
                text: None,
                from_me: false,
            },
            message("bob", "   "),
            WhatsAppEvent::ConnectionUpdate {
                state: ConnectionState::Connected,
                error: None,
            },
            message("bob", "/tool_rental"),
        ],
    )
    .await;

    let sent = sink.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "bob");
    assert!(sent[0].1.contains("UnlockTool"));
}

#[tokio::test]
async fn welcome_precedes_first_reply() {
    let handler = setup_handler().await.with_greeter(Greeter::new(
        NonZeroUsize::new(16).expect("non-zero"),
        Duration::from_secs(3600),
        "welcome!",
    ));
    let sink = Arc::new(RecordingSink::default());
    run_events(
        handler,
        Arc::clone(&sink),
        vec![message("carol", "/foo"), message("carol", "/foo")],
    )
    .await;

    let sent = sink.sent.lock().await;
    let texts: Vec<&str> = sent.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(texts.len(), 3);
    assert_eq!(texts[0], "welcome!");
    assert!(texts[1].contains("Unknown command"));
    assert!(texts[2].contains("Unknown command"));
}

#[tokio::test]
async fn logout_stops_the_loop() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(WhatsAppEvent::ConnectionUpdate {
        state: ConnectionState::LoggedOut,
        error: Some("revoked".to_owned()),
    })
    .await
    .expect("channel open");

    let dispatcher = Dispatcher::new(
        Arc::new(setup_handler().await),
        Arc::new(RecordingSink::default()),
    );
    let outcome = run(
        dispatcher,
        rx,
        std::future::pending::<()>(),
        Duration::from_secs(1),
    )
    .await;
    assert_eq!(outcome, RunOutcome::LoggedOut);
    drop(tx);
}

#[tokio::test]
async fn shutdown_future_stops_the_loop() {
    let (_tx, rx) = mpsc::channel::<WhatsAppEvent>(4);
    let dispatcher = Dispatcher::new(
        Arc::new(setup_handler().await),
        Arc::new(RecordingSink::default()),
    );
    let outcome = run(dispatcher, rx, async {}, Duration::from_secs(1)).await;
    assert_eq!(outcome, RunOutcome::Shutdown);
}

#[tokio::test]
async fn send_failures_do_not_stop_processing() {
    let handler = Arc::new(setup_handler().await);
    let mut dispatcher = Dispatcher::new(Arc::clone(&handler), Arc::new(BrokenSink));
    dispatcher.dispatch("dave", "/rent_tool UnlockTool");
    dispatcher.dispatch("dave", "/UnlockTool_status");
    dispatcher.drain(Duration::from_secs(5)).await;

    // The rent still went through even though no reply could be delivered.
    let reply = handler
        .handle_inbound_message("dave", "/UnlockTool_status")
        .await;
    assert!(reply.contains("In Use"));
}

#[tokio::test]
async fn pending_senders_tracks_in_flight_chains() {
    let sink = Arc::new(RecordingSink {
        stall_first: Some(Duration::from_millis(500)),
        ..RecordingSink::default()
    });
    let mut dispatcher = Dispatcher::new(Arc::new(setup_handler().await), sink.clone());
    assert_eq!(dispatcher.pending_senders(), 0);

    dispatcher.dispatch("erin", "/UnlockTool_status");
    dispatcher.dispatch("erin", "/tool_rental");
    assert_eq!(dispatcher.pending_senders(), 1);

    dispatcher.drain(Duration::from_secs(5)).await;
    assert_eq!(sink.sent.lock().await.len(), 2);
}

#[tokio::test]
async fn panicking_reply_task_does_not_break_drain() {
    let handler = Arc::new(setup_handler().await);
    let mut dispatcher = Dispatcher::new(Arc::clone(&handler), Arc::new(PanickingSink));
    dispatcher.dispatch("frank", "/rent_tool UnlockTool");
    dispatcher.dispatch("gina", "/UnlockTool_status");
    dispatcher.drain(Duration::from_secs(5)).await;

    // The store change landed before the send panicked.
    let reply = handler
        .handle_inbound_message("frank", "/UnlockTool_status")
        .await;
    assert!(reply.contains("In Use"));
}
