//! HTTP client for the WhatsApp bridge sidecar.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{MessageSink, WhatsAppError};

/// Default port the WhatsApp bridge listens on.
pub const DEFAULT_BRIDGE_PORT: u16 = 3001;

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for normal operations.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Number of health-check retries before giving up.
const HEALTH_CHECK_RETRIES: u32 = 5;

/// Delay between health-check attempts in milliseconds.
const HEALTH_CHECK_DELAY_MS: u64 = 2000;

/// Client for the WhatsApp HTTP bridge.
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
}

/// Connection status from the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppStatus {
    /// Whether the sidecar is connected to WhatsApp.
    pub connected: bool,
    /// The phone number linked, if connected.
    pub phone_number: Option<String>,
}

/// Response envelope from the bridge HTTP API.
#[derive(Deserialize)]
struct BridgeResponse<T> {
    data: Option<T>,
}

impl WhatsAppClient {
    /// Create a new client pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    /// Check whether the sidecar is reachable and connected to WhatsApp.
    pub async fn health_check(&self) -> bool {
        match self.status().await {
            Ok(status) => status.connected,
            Err(e) => {
                debug!(error = %e, "bridge health check failed");
                false
            }
        }
    }

    /// Wait for the sidecar to become healthy, retrying with a fixed delay.
    pub async fn wait_healthy(&self) -> Result<(), WhatsAppError> {
        for attempt in 0..HEALTH_CHECK_RETRIES {
            if self.health_check().await {
                return Ok(());
            }
            if attempt < HEALTH_CHECK_RETRIES.saturating_sub(1) {
                tokio::time::sleep(std::time::Duration::from_millis(HEALTH_CHECK_DELAY_MS)).await;
            }
        }
        Err(WhatsAppError::SidecarNotRunning)
    }

    /// Get the current connection status from the sidecar.
    pub async fn status(&self) -> Result<WhatsAppStatus, WhatsAppError> {
        let url = format!("{}/status", self.base_url);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(WhatsAppError::SidecarNotRunning);
        }
        let body: BridgeResponse<WhatsAppStatus> = resp.json().await?;
        body.data.ok_or(WhatsAppError::SidecarNotRunning)
    }

    /// Returns the base URL of the sidecar.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MessageSink for WhatsAppClient {
    async fn send_text(&self, jid: &str, text: &str) -> Result<(), WhatsAppError> {
        let url = format!("{}/send", self.base_url);
        let body = serde_json::json!({ "jid": jid, "text": text });
        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(status, jid, "WhatsApp send failed");
            return Err(WhatsAppError::SendFailed { status, body });
        }
        debug!(jid, "message sent via WhatsApp");
        Ok(())
    }
}
