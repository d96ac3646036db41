//! Remote bank ledger over HTTP
//!
//! Authenticates with OAuth2 client credentials and caches the bearer
//! token until shortly before expiry. Settlements carry the caller's
//! idempotency token in an `Idempotency-Key` header, so the bank API
//! dedups retries on its side the same way the local ledger does.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use cb_core::domain::entities::transfer_request::TransferRequest;
use cb_core::services::transfer::{BalanceInfo, LedgerError, LedgerExecutor, LedgerReceipt};
use cb_shared::config::LedgerConfig;
use cb_shared::types::PhoneNumber;

use crate::InfrastructureError;

/// Seconds before nominal expiry at which a cached token is refreshed
const TOKEN_EXPIRY_MARGIN_SECONDS: i64 = 30;

/// Bank API ledger client
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + chrono::Duration::seconds(TOKEN_EXPIRY_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Serialize)]
struct TransferPayload<'a> {
    from_account: &'a str,
    to_account: &'a str,
    amount: Decimal,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    concept: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    reference: String,
    executed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: Decimal,
    currency: String,
}

impl HttpLedger {
    /// Build the client, validating connection settings up front
    pub fn new(config: &LedgerConfig) -> Result<Self, InfrastructureError> {
        if config.base_url.is_empty()
            || config.oauth_token_url.is_empty()
            || config.client_id.is_empty()
            || config.client_secret.is_empty()
        {
            return Err(InfrastructureError::Config(
                "http ledger mode requires LEDGER_BASE_URL, LEDGER_OAUTH_TOKEN_URL, \
                 LEDGER_CLIENT_ID and LEDGER_CLIENT_SECRET"
                    .to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token_url: config.oauth_token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: RwLock::new(None),
        })
    }

    /// Fetch or reuse the OAuth2 bearer token
    async fn bearer_token(&self) -> Result<String, LedgerError> {
        let now = Utc::now();

        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable {
                reason: format!("token endpoint unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Ledger token request refused");
            return Err(LedgerError::Unavailable {
                reason: format!("token endpoint answered {}", response.status()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| LedgerError::Unavailable {
            reason: format!("token response decode failed: {}", e),
        })?;

        let expires_at = now + chrono::Duration::seconds(body.expires_in as i64);
        *guard = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at,
        });

        debug!("Ledger bearer token refreshed");
        Ok(body.access_token)
    }

    /// Drop the cached token after the API refused it
    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl LedgerExecutor for HttpLedger {
    async fn execute_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<LedgerReceipt, LedgerError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/transfers", self.base_url);

        let payload = TransferPayload {
            from_account: request.phone.as_e164(),
            to_account: &request.destination,
            amount: request.amount,
            currency: &request.currency,
            concept: request.concept.as_deref(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Idempotency-Key", &request.idempotency_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable {
                reason: format!("bank API unreachable: {}", e),
            })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // Token went stale server-side; next call re-authenticates
            self.invalidate_token().await;
            return Err(LedgerError::Unavailable {
                reason: format!("bank API refused credentials ({})", status),
            });
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LedgerError::Unavailable {
                reason: format!("bank API answered {}", status),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Rejected {
                reason: format!("bank API answered {}: {}", status, body),
            });
        }

        let body: TransferResponse =
            response.json().await.map_err(|e| LedgerError::Unavailable {
                reason: format!("settle response decode failed: {}", e),
            })?;

        debug!(
            phone = %request.phone.masked(),
            reference = %body.reference,
            "Transfer settled by bank API"
        );

        Ok(LedgerReceipt {
            reference: body.reference,
            executed_at: body.executed_at.unwrap_or_else(Utc::now),
        })
    }

    async fn balance(&self, phone: &PhoneNumber) -> Result<BalanceInfo, LedgerError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/accounts/{}/balance", self.base_url, phone.as_e164());

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable {
                reason: format!("bank API unreachable: {}", e),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.invalidate_token().await;
            return Err(LedgerError::Unavailable {
                reason: format!("bank API refused credentials ({})", status),
            });
        }
        if !status.is_success() {
            return Err(LedgerError::Unavailable {
                reason: format!("bank API answered {}", status),
            });
        }

        let body: BalanceResponse =
            response.json().await.map_err(|e| LedgerError::Unavailable {
                reason: format!("balance response decode failed: {}", e),
            })?;

        Ok(BalanceInfo {
            phone: phone.clone(),
            balance: body.balance,
            currency: body.currency,
        })
    }
}
