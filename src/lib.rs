//! toolrent — a WhatsApp bot for renting tools from a shared inventory.
//!
//! Inbound text is classified by [`router`], executed against the tool store
//! by [`inventory`], and answered through the WhatsApp bridge. See
//! `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod inventory;
pub mod router;

pub mod dispatch;
pub mod greeting;
pub mod handler;
pub mod health;
pub mod whatsapp;
