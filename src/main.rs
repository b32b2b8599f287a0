//! toolrent CLI entry point.
//!
//! Provides `start`, `seed`, and `ask` subcommands for running the bot,
//! loading a tool catalog, or answering a single command locally.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use toolrent::config::Config;
use toolrent::dispatch::{self, Dispatcher, RunOutcome};
use toolrent::greeting::Greeter;
use toolrent::handler::MessageHandler;
use toolrent::health;
use toolrent::inventory::catalog;
use toolrent::inventory::service::InventoryService;
use toolrent::inventory::store::SqliteToolStore;
use toolrent::whatsapp::client::WhatsAppClient;
use toolrent::whatsapp::events;

/// toolrent — tool rental bot for WhatsApp.
#[derive(Parser)]
#[command(name = "toolrent", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the bot against the WhatsApp bridge.
    Start,
    /// Load tool records from a TOML catalog into the store.
    Seed {
        /// Path to the catalog file.
        catalog: PathBuf,
        /// Overwrite the status of existing records with the catalog value.
        #[arg(long)]
        reset_status: bool,
    },
    /// Answer one command as if it arrived over WhatsApp and print the reply.
    Ask {
        /// Sender id to use.
        #[arg(long, default_value = "cli")]
        sender: String,
        /// Message text, e.g. `/tool_rental`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Command::Start => handle_start(config).await,
        Command::Seed {
            catalog,
            reset_status,
        } => handle_seed(config, catalog, reset_status).await,
        Command::Ask { sender, text } => handle_ask(config, &sender, &text.join(" ")).await,
    }
}

/// Run the bot until Ctrl-C or logout.
async fn handle_start(config: Config) -> anyhow::Result<()> {
    let _logging_guard =
        toolrent::logging::init_production(&config.logging.logs_dir, &config.logging.level)?;

    let store = SqliteToolStore::open(&config.store.db_path)
        .await
        .with_context(|| format!("failed to open {}", config.store.db_path.display()))?;
    let handler = Arc::new(build_handler(&config, store));

    let _health = if config.health.enabled {
        let addr = config.health.socket_addr()?;
        let (bound, handle) = health::spawn_health_server(addr)
            .await
            .with_context(|| format!("failed to bind health endpoint on {addr}"))?;
        info!(%bound, "health endpoint ready");
        Some(handle)
    } else {
        None
    };

    let client = Arc::new(WhatsAppClient::new(config.whatsapp.bridge_url.clone()));
    if let Err(e) = client.wait_healthy().await {
        warn!(error = %e, url = client.base_url(), "WhatsApp bridge not ready yet, will keep polling");
    }

    let (event_tx, event_rx) = mpsc::channel(config.bot.channel_buffer_size.max(1));
    let listener = events::spawn_event_listener(config.whatsapp.bridge_url.clone(), event_tx);

    info!("toolrent ready, listening for messages");
    let dispatcher = Dispatcher::new(handler, client);
    let outcome = dispatch::run(
        dispatcher,
        event_rx,
        shutdown_signal(),
        Duration::from_secs(config.bot.shutdown_timeout_secs),
    )
    .await;
    listener.abort();

    match outcome {
        RunOutcome::LoggedOut => Err(anyhow::anyhow!(
            "WhatsApp session logged out; re-pair the bridge and restart"
        )),
        RunOutcome::Shutdown | RunOutcome::StreamClosed => {
            info!(?outcome, "toolrent shut down");
            Ok(())
        }
    }
}

/// Upsert a catalog file into the store.
async fn handle_seed(config: Config, path: PathBuf, reset_status: bool) -> anyhow::Result<()> {
    toolrent::logging::init_cli(&config.logging.level);

    let tools = catalog::load_catalog(&path)
        .with_context(|| format!("failed to load catalog {}", path.display()))?;
    let store = SqliteToolStore::open(&config.store.db_path)
        .await
        .with_context(|| format!("failed to open {}", config.store.db_path.display()))?;

    let count = catalog::seed(&store, &tools, reset_status)
        .await
        .context("failed to seed catalog")?;
    println!("Seeded {count} tools into {}", config.store.db_path.display());
    Ok(())
}

/// Print the reply to a single command.
async fn handle_ask(config: Config, sender: &str, text: &str) -> anyhow::Result<()> {
    toolrent::logging::init_cli(&config.logging.level);

    let store = SqliteToolStore::open(&config.store.db_path)
        .await
        .with_context(|| format!("failed to open {}", config.store.db_path.display()))?;
    let handler = MessageHandler::new(InventoryService::new(Arc::new(store)));

    println!("{}", handler.handle_inbound_message(sender, text).await);
    Ok(())
}

fn build_handler(config: &Config, store: SqliteToolStore) -> MessageHandler {
    let handler = MessageHandler::new(InventoryService::new(Arc::new(store)));
    if !config.bot.welcome_enabled {
        return handler;
    }
    handler.with_greeter(Greeter::new(
        config.bot.known_senders_capacity(),
        config.bot.known_senders_ttl(),
        config.bot.welcome_message.clone(),
    ))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, running until the stream ends");
        std::future::pending::<()>().await;
    }
}
