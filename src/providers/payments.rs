//! RPC transfer service integration.
//!
//! Real-money movement happens here and nowhere else. The service keys
//! transfers on the memo, so replaying a request after a timeout settles
//! to the original transfer instead of paying twice.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use super::{TransferCapability, TransferReceipt};
use crate::types::MarketError;

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the treasury's transfer RPC.
pub struct RpcTransferClient {
    http: Client,
    rpc_url: String,
    api_key: SecretString,
}

impl RpcTransferClient {
    pub fn new(
        rpc_url: String,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("castmarket/0.1.0")
            .build()
            .map_err(|e| MarketError::PaymentFailed(e.to_string()))?;

        Ok(Self {
            http,
            rpc_url,
            api_key,
        })
    }
}

#[async_trait]
impl TransferCapability for RpcTransferClient {
    async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
        memo: &str,
    ) -> Result<TransferReceipt, MarketError> {
        let body = serde_json::json!({
            "from": from_account,
            "to": to_account,
            "amount": amount,
            "idempotency_key": memo,
        });

        let resp = self
            .http
            .post(format!("{}/transfers", self.rpc_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| MarketError::PaymentFailed(format!("transfer request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(%status, memo, "Transfer RPC rejected");
            return Err(MarketError::PaymentFailed(format!(
                "transfer {status}: {text}"
            )));
        }

        let result: TransferResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::PaymentFailed(format!("transfer parse: {e}")))?;

        if result.status != "completed" {
            let detail = result.error.unwrap_or_else(|| result.status.clone());
            return Err(MarketError::PaymentFailed(detail));
        }

        let reference = result
            .reference
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            from = from_account,
            to = to_account,
            %amount,
            reference = %reference,
            "Transfer completed"
        );

        Ok(TransferReceipt {
            reference,
            completed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
