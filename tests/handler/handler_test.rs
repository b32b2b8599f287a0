//! Tests for `handler::MessageHandler`.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use toolrent::greeting::Greeter;
use toolrent::handler::{MessageHandler, STORE_UNAVAILABLE_REPLY};
use toolrent::inventory::service::InventoryService;
use toolrent::inventory::store::SqliteToolStore;
use toolrent::inventory::{Pricing, StoreError, Tool, ToolStatus, ToolStore};

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

struct DownStore;

#[async_trait]
impl ToolStore for DownStore {
    async fn list_all(&self) -> Result<Vec<Tool>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolClosed))
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<Tool>, StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolClosed))
    }

    async fn conditional_update(
        &self,
        _id: &str,
        _expected: ToolStatus,
        _new: ToolStatus,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(sqlx::Error::PoolClosed))
    }
}

#[tokio::test]
async fn status_then_rent_then_status() {
    let handler = setup_handler().await;

    let before = handler
        .handle_inbound_message("user-1", "/UnlockTool_status")
        .await;
    assert!(before.contains("Available"));
    assert!(before.contains("20"));
    assert!(before.contains("30"));

    let rented = handler
        .handle_inbound_message("user-1", "/rent_tool UnlockTool")
        .await;
    assert!(rented.contains("You rented"));

    let after = handler
        .handle_inbound_message("user-2", "/UnlockTool_status")
        .await;
    assert!(after.contains("In Use"));
}

#[tokio::test]
async fn unknown_command_lists_usage_hints() {
    let handler = setup_handler().await;
    let reply = handler.handle_inbound_message("user-1", "/foo").await;
    assert!(reply.contains("/foo"));
    assert!(reply.contains("/tool_rental"));
    assert!(reply.contains("/<name>_status"));
}

#[tokio::test]
async fn missing_argument_does_not_touch_store() {
    let handler = MessageHandler::new(InventoryService::new(Arc::new(DownStore)));
    let reply = handler.handle_inbound_message("user-1", "/tool_status").await;
    assert!(reply.contains("/tool_status <name>"));
    assert_ne!(reply, STORE_UNAVAILABLE_REPLY);
}

#[tokio::test]
async fn store_failure_becomes_apology() {
    let handler = MessageHandler::new(InventoryService::new(Arc::new(DownStore)));
    for text in ["/tool_rental", "/Drill_status", "/rent_tool Drill", "/return_tool Drill"] {
        let reply = handler.handle_inbound_message("user-1", text).await;
        assert_eq!(reply, STORE_UNAVAILABLE_REPLY, "for {text:?}");
    }
}

#[tokio::test]
async fn bad_rates_record_still_lists_and_rents() {
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
    sqlx::query("INSERT INTO tools (id, name, status, rates) VALUES ('drill', 'Drill', 'available', '[10, 20]')")
        .execute(store.pool())
        .await
        .expect("raw insert");
    let handler = MessageHandler::new(InventoryService::new(Arc::new(store)));

    let listing = handler.handle_inbound_message("user-1", "/tool_rental").await;
    assert!(listing.contains("*UnlockTool* ✅ Available\nPrice: 20 for 30 min"));
    assert!(listing.contains("*Drill* ✅ Available\nNo rate info"));

    let status = handler.handle_inbound_message("user-1", "/Drill_status").await;
    assert_eq!(status, "*Drill* ✅ Available\nNo rate info");

    let rented = handler.handle_inbound_message("user-1", "/rent_tool Drill").await;
    assert!(rented.contains("You rented *Drill*"));
}

#[tokio::test]
async fn every_input_gets_a_non_empty_reply() {
    let handler = setup_handler().await;
    let inputs = [
        "",
        "   ",
        "/",
        "/_status",
        "/status",
        "/tool_rental",
        "/rent_tool ???",
        "/return_tool UnlockTool",
        "/return_tool UnlockTool",
        "😀",
        "/ünïcode_status",
        "random chatter",
    ];
    for input in inputs {
        let reply = handler.handle_inbound_message("user-1", input).await;
        assert!(!reply.trim().is_empty(), "empty reply for {input:?}");
    }
}

#[tokio::test]
async fn welcome_is_sent_once_per_sender() {
    let handler = setup_handler().await.with_greeter(Greeter::new(
        NonZeroUsize::new(8).expect("non-zero"),
        Duration::from_secs(3600),
        "hello!",
    ));
    assert_eq!(handler.welcome_for("a").await.as_deref(), Some("hello!"));
    assert_eq!(handler.welcome_for("a").await, None);
    assert_eq!(handler.welcome_for("b").await.as_deref(), Some("hello!"));
}

#[tokio::test]
async fn no_greeter_means_no_welcome() {
    let handler = setup_handler().await;
    assert_eq!(handler.welcome_for("a").await, None);
}
