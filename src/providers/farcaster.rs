//! Neynar (Farcaster hub API) integration.
//!
//! Implements both `IdentityProvider` (profile lookup) and
//! `MetricsProvider` (activity metrics over the user's recent casts).
//!
//! Auth: `x-api-key` header on every request.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{IdentityProvider, IdentitySnapshot, MetricsProvider};
use crate::types::{Fid, MarketError, MetricKind};

/// Casts fetched per metric read (API page max).
const CASTS_FETCH_LIMIT: u32 = 150;

/// Engagement-score blend weights. Fixed by the scoring model, not config.
const W_FOLLOWERS: Decimal = dec!(0.3);
const W_FOLLOWING: Decimal = dec!(0.2);
const W_CASTS: Decimal = dec!(0.5);

// ---------------------------------------------------------------------------
// API response types (Neynar JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BulkUsersResponse {
    users: Vec<NeynarUser>,
}

/// Neynar user object — only the fields we need.
#[derive(Debug, Deserialize)]
struct NeynarUser {
    fid: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    pfp_url: Option<String>,
    #[serde(default)]
    follower_count: i64,
    #[serde(default)]
    following_count: i64,
    #[serde(default)]
    verified_addresses: Option<VerifiedAddresses>,
}

#[derive(Debug, Deserialize)]
struct VerifiedAddresses {
    #[serde(default)]
    eth_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CastsResponse {
    casts: Vec<NeynarCast>,
}

#[derive(Debug, Deserialize)]
struct NeynarCast {
    #[serde(default)]
    reactions: CastReactions,
}

#[derive(Debug, Deserialize, Default)]
struct CastReactions {
    #[serde(default)]
    likes_count: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Neynar API client.
pub struct NeynarClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl NeynarClient {
    pub fn new(base_url: String, api_key: SecretString) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("castmarket/0.1.0")
            .build()
            .map_err(|e| MarketError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, MarketError> {
        debug!(url = %url, "Neynar request");

        let resp = self
            .http
            .get(url)
            .header("x-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| MarketError::ProviderUnavailable(format!("neynar request: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "Neynar API error");
            return Err(MarketError::ProviderUnavailable(format!(
                "neynar {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| MarketError::ProviderUnavailable(format!("neynar parse: {e}")))
    }

    async fn fetch_user(&self, fid: Fid) -> Result<NeynarUser, MarketError> {
        let url = format!("{}/farcaster/user/bulk?fids={fid}", self.base_url);
        let resp: BulkUsersResponse = self.get_json(&url).await?;
        resp.users
            .into_iter()
            .find(|u| u.fid == fid)
            .ok_or(MarketError::UserNotFound(fid))
    }

    async fn fetch_casts(&self, fid: Fid) -> Result<Vec<NeynarCast>, MarketError> {
        let url = format!(
            "{}/farcaster/feed/user/casts?fid={fid}&limit={CASTS_FETCH_LIMIT}",
            self.base_url
        );
        let resp: CastsResponse = self.get_json(&url).await?;
        Ok(resp.casts)
    }

    /// Blended activity score over profile counts and recent cast volume.
    fn engagement_score(followers: i64, following: i64, casts: i64) -> Decimal {
        Decimal::from(followers) * W_FOLLOWERS
            + Decimal::from(following) * W_FOLLOWING
            + Decimal::from(casts) * W_CASTS
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl IdentityProvider for NeynarClient {
    async fn lookup(&self, fid: Fid) -> Result<IdentitySnapshot, MarketError> {
        let user = self.fetch_user(fid).await?;
        let wallet = user
            .verified_addresses
            .and_then(|a| a.eth_addresses.into_iter().next());

        Ok(IdentitySnapshot {
            fid: user.fid,
            username: user.username,
            display_name: user.display_name,
            pfp_url: user.pfp_url,
            wallet,
            followers_count: user.follower_count,
            following_count: user.following_count,
        })
    }
}

#[async_trait]
impl MetricsProvider for NeynarClient {
    async fn fetch_metric(
        &self,
        subject: Fid,
        metric: MetricKind,
    ) -> Result<Decimal, MarketError> {
        let value = match metric {
            MetricKind::CastsCount => {
                let casts = self.fetch_casts(subject).await?;
                Decimal::from(casts.len() as u64)
            }
            MetricKind::LikesTotal => {
                let casts = self.fetch_casts(subject).await?;
                let likes: i64 = casts.iter().map(|c| c.reactions.likes_count).sum();
                Decimal::from(likes)
            }
            MetricKind::EngagementScore => {
                let user = self.fetch_user(subject).await?;
                let casts = self.fetch_casts(subject).await?;
                Self::engagement_score(
                    user.follower_count,
                    user.following_count,
                    casts.len() as i64,
                )
            }
        };

        debug!(fid = subject, %metric, %value, at = %Utc::now(), "Metric observed");
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
