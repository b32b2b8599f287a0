//! Inbound message boundary: text in, reply text out.
//!
//! [`MessageHandler::handle_inbound_message`] never fails. Store errors are
//! logged and answered with a generic apology so one bad request cannot
//! stop the event loop.

use tracing::{debug, warn};

use crate::greeting::Greeter;
use crate::inventory::service::InventoryService;
use crate::router::{self, Intent};

/// Reply sent when the tool store cannot be reached.
pub const STORE_UNAVAILABLE_REPLY: &str =
    "😓 Sorry, the tool catalog is unavailable right now. Please try again later.";

/// Routes classified commands to the inventory and renders replies.
pub struct MessageHandler {
    inventory: InventoryService,
    greeter: Option<Greeter>,
}

impl MessageHandler {
    /// Create a handler without a welcome message.
    pub fn new(inventory: InventoryService) -> Self {
        Self {
            inventory,
            greeter: None,
        }
    }

    /// Greet first-time senders with the given greeter.
    pub fn with_greeter(mut self, greeter: Greeter) -> Self {
        self.greeter = Some(greeter);
        self
    }

    /// Welcome text for `sender`, if greeting is enabled and due.
    pub async fn welcome_for(&self, sender: &str) -> Option<String> {
        match &self.greeter {
            Some(greeter) => greeter.welcome_for(sender).await,
            None => None,
        }
    }

    /// Classify `raw_text`, run it against the inventory, and return the reply.
    ///
    /// The reply is never empty.
    pub async fn handle_inbound_message(&self, sender: &str, raw_text: &str) -> String {
        let intent = router::classify(raw_text);
        debug!(sender, ?intent, "classified inbound message");

        let result = match &intent {
            Intent::ListTools => self.inventory.list_tools().await,
            Intent::GetStatus(name) => self.inventory.get_status(name).await,
            Intent::RentTool(name) => self.inventory.rent_tool(name).await,
            Intent::ReturnTool(name) => self.inventory.return_tool(name).await,
            Intent::Help => Ok(router::help_text()),
            Intent::MissingArgument(command) => Ok(router::missing_argument_reply(*command)),
            Intent::Unknown(text) => Ok(router::unknown_reply(text)),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(sender, ?intent, error = %e, "inventory request failed");
                STORE_UNAVAILABLE_REPLY.to_owned()
            }
        }
    }
}
