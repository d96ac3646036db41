//! Webhook authentication configuration

use serde::{Deserialize, Serialize};

/// Shared-secret configuration for inbound webhook signatures
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Shared secret the gateway signs requests with.
    /// An empty secret makes every signature check fail (fail closed).
    #[serde(default)]
    pub signing_secret: String,

    /// Public base URL of this server as seen by the gateway
    /// (signatures cover the full external URL, not the internal one)
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl WebhookConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            signing_secret: std::env::var("WEBHOOK_SIGNING_SECRET").unwrap_or_default(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| default_public_base_url()),
        }
    }

    /// Full public URL for a request path
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

fn default_public_base_url() -> String {
    String::from("http://localhost:8080")
}
