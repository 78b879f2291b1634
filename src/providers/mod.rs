//! External capability seams.
//!
//! Defines the traits the core consumes and provides implementations for:
//! - Neynar (Farcaster hub API) — identity lookup and activity metrics
//! - RPC transfer service — stake collection, fee routing, payouts
//!
//! The core never branches on an environment flag: test doubles implement
//! the same traits, and every caller takes `Arc<dyn Trait>`.

pub mod farcaster;
pub mod payments;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::{Fid, MarketError, MetricKind};

/// Observed identity attributes as returned by the identity provider.
#[derive(Debug, Clone)]
pub struct IdentitySnapshot {
    pub fid: Fid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub wallet: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
}

/// Receipt for a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub reference: String,
    pub completed_at: DateTime<Utc>,
}

/// Reads a subject's observed activity metric.
///
/// A failed fetch means "cannot settle yet", never "observed value zero":
/// implementations return `ProviderUnavailable`, not a default.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn fetch_metric(&self, subject: Fid, metric: MetricKind)
        -> Result<Decimal, MarketError>;
}

/// Resolves a numeric identity to its profile attributes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn lookup(&self, fid: Fid) -> Result<IdentitySnapshot, MarketError>;
}

/// Moves funds between accounts.
///
/// `memo` doubles as the idempotency key: implementations must treat a
/// repeated (from, to, amount, memo) call as the same transfer, so a retry
/// after a timeout can never pay twice.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransferCapability: Send + Sync {
    async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
        memo: &str,
    ) -> Result<TransferReceipt, MarketError>;
}
