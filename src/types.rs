//! Shared types for the CASTMARKET engine.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that ledger, settlement, and
//! withdrawal modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Farcaster identity id (numeric, opaque to the core).
pub type Fid = i64;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The social-activity metric a market is settled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CastsCount,
    LikesTotal,
    EngagementScore,
}

impl MetricKind {
    /// All known metric kinds (useful for iteration and validation).
    pub const ALL: &'static [MetricKind] = &[
        MetricKind::CastsCount,
        MetricKind::LikesTotal,
        MetricKind::EngagementScore,
    ];
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::CastsCount => write!(f, "casts_count"),
            MetricKind::LikesTotal => write!(f, "likes_total"),
            MetricKind::EngagementScore => write!(f, "engagement_score"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "casts_count" => Ok(MetricKind::CastsCount),
            "likes_total" => Ok(MetricKind::LikesTotal),
            "engagement_score" => Ok(MetricKind::EngagementScore),
            other => Err(MarketError::InvalidMetricKind(other.to_string())),
        }
    }
}

/// Side of a binary over/under proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Over,
    Under,
}

impl Direction {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Over => Direction::Under,
            Direction::Under => Direction::Over,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "over" => Ok(Direction::Over),
            "under" => Ok(Direction::Under),
            other => Err(MarketError::InvalidPrediction(other.to_string())),
        }
    }
}

/// Market lifecycle status. `Settled` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Settled,
    Cancelled,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Active => write!(f, "active"),
            MarketStatus::Settled => write!(f, "settled"),
            MarketStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for MarketStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MarketStatus::Active),
            "settled" => Ok(MarketStatus::Settled),
            "cancelled" => Ok(MarketStatus::Cancelled),
            other => Err(MarketError::Storage(format!(
                "unknown market status: {other}"
            ))),
        }
    }
}

/// Bet lifecycle status.
///
/// A bet is conceptually `Pending` between creation and the stake-collection
/// transfer; it is only persisted once `Active`. `Won`, `Lost` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Active,
    Won,
    Lost,
    Cancelled,
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetStatus::Pending => write!(f, "pending"),
            BetStatus::Active => write!(f, "active"),
            BetStatus::Won => write!(f, "won"),
            BetStatus::Lost => write!(f, "lost"),
            BetStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BetStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BetStatus::Pending),
            "active" => Ok(BetStatus::Active),
            "won" => Ok(BetStatus::Won),
            "lost" => Ok(BetStatus::Lost),
            "cancelled" => Ok(BetStatus::Cancelled),
            other => Err(MarketError::Storage(format!("unknown bet status: {other}"))),
        }
    }
}

/// Withdrawal lifecycle status. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "completed" => Ok(WithdrawalStatus::Completed),
            "failed" => Ok(WithdrawalStatus::Failed),
            other => Err(MarketError::Storage(format!(
                "unknown withdrawal status: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A binary prediction market on one subject's activity metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: i64,
    /// The Farcaster user whose activity the market is about.
    pub subject_fid: Fid,
    pub metric: MetricKind,
    pub threshold: Decimal,
    /// How the proposition is framed ("over 20 casts" vs "under 20 casts").
    /// Classification at settlement uses each bet's own prediction.
    pub direction: Direction,
    pub status: MarketStatus,
    pub created_at: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Set exactly once, at settlement.
    pub settled_at: Option<DateTime<Utc>>,
    /// Observed metric value, set exactly once at settlement.
    pub result_value: Option<Decimal>,
    /// Sum of all constituent bet stakes. Monotonically increasing.
    pub total_pool: Decimal,
}

impl Market {
    /// Whether the market still accepts bets at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == MarketStatus::Active && now < self.end_time
    }

    /// Whether the market has passed its end time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "market #{} fid={} {} {} {} (pool ${}, {})",
            self.id,
            self.subject_fid,
            self.metric,
            self.direction,
            self.threshold,
            self.total_pool,
            self.status,
        )
    }
}

/// Parameters for persisting a new market.
#[derive(Debug, Clone)]
pub struct NewMarket {
    pub subject_fid: Fid,
    pub metric: MetricKind,
    pub threshold: Decimal,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// A single stake on one side of a market.
///
/// The prediction is fixed at creation and never mutated; only status,
/// payout, fee_on_win and settled_at change, exactly once, at settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub market_id: i64,
    pub bettor_fid: Fid,
    /// Source account the stake was collected from.
    pub wallet: String,
    pub prediction: Direction,
    pub amount: Decimal,
    /// The flat fee actually charged at placement (value, not rate).
    pub base_fee: Decimal,
    /// Net payout, set only if the bet won. `None` means "never computed",
    /// which is distinct from a computed zero.
    pub payout: Option<Decimal>,
    /// Win fee actually charged, set only if the bet won.
    pub fee_on_win: Option<Decimal>,
    pub status: BetStatus,
    /// Reference of the stake-collection transfer.
    pub transfer_ref: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bet #{} market={} fid={} {} ${} ({})",
            self.id, self.market_id, self.bettor_fid, self.prediction, self.amount, self.status,
        )
    }
}

/// Parameters for persisting a newly accepted bet.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub market_id: i64,
    pub bettor_fid: Fid,
    pub wallet: String,
    pub prediction: Direction,
    pub amount: Decimal,
    pub base_fee: Decimal,
    pub transfer_ref: String,
    pub placed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// A request to pay out part of a user's derived balance.
///
/// The amount is fixed at creation. At request time the amount must fit
/// the balance net of other pending withdrawals, checked under a per-user
/// lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: i64,
    pub fid: Fid,
    /// Destination account.
    pub wallet: String,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    /// Payout transfer reference, set on success.
    pub transfer_ref: Option<String>,
    /// Transfer-layer error, set on failure.
    pub error_detail: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl fmt::Display for Withdrawal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "withdrawal #{} fid={} ${} ({})",
            self.id, self.fid, self.amount, self.status,
        )
    }
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Cached view of an external Farcaster identity. Not authoritative:
/// created lazily on first reference and refreshed from the identity
/// provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub fid: Fid,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub wallet: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for CASTMARKET.
///
/// Validation and state errors are detected synchronously and returned
/// without mutating the ledger.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("market not found: {0}")]
    MarketNotFound(i64),

    #[error("bet not found: {0}")]
    BetNotFound(i64),

    #[error("withdrawal not found: {0}")]
    WithdrawalNotFound(i64),

    #[error("user not found: {0}")]
    UserNotFound(Fid),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("invalid metric kind: {0}")]
    InvalidMetricKind(String),

    #[error("invalid duration: {0} hours")]
    InvalidDuration(i64),

    #[error("insufficient balance: requested ${requested}, available ${available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("metrics provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for MarketError {
    fn from(e: sqlx::Error) -> Self {
        MarketError::Storage(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
