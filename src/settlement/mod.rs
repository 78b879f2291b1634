//! Settlement engine.
//!
//! Turns a closed market plus an observed metric value into terminal bet
//! outcomes: winners recover their stake plus an equal slice of the
//! post-house-cut pool, net of the win fee; losers forfeit their stake.
//! The plan is computed as a pure function and applied by the ledger in a
//! single transaction; only the post-commit win-fee transfers are
//! best-effort.

use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::fees::FeePolicy;
use crate::ledger::{BetOutcome, Ledger, SettlementPlan};
use crate::providers::{MetricsProvider, TransferCapability};
use crate::types::{Bet, BetStatus, Direction, Market, MarketError, MarketStatus};

// ---------------------------------------------------------------------------
// Pure settlement math
// ---------------------------------------------------------------------------

/// Whether a prediction wins against the observed value.
///
/// The bet's own prediction is the sole input; the market's framing
/// direction plays no part. A tie (`observed == threshold`) loses for
/// both sides — fixed policy, not an accident of comparison.
pub fn is_winner(prediction: Direction, observed: Decimal, threshold: Decimal) -> bool {
    match prediction {
        Direction::Over => observed > threshold,
        Direction::Under => observed < threshold,
    }
}

/// Compute the full settlement plan for a market's bet set.
///
/// Only `active` bets participate. With zero winners the whole pool
/// forfeits to the house and every bet is marked lost with payout unset.
pub fn build_plan(
    fees: &FeePolicy,
    bets: &[Bet],
    observed: Decimal,
    settled_at: chrono::DateTime<chrono::Utc>,
    threshold: Decimal,
) -> SettlementPlan {
    let participants: Vec<&Bet> = bets
        .iter()
        .filter(|b| b.status == BetStatus::Active)
        .collect();

    let total_pool: Decimal = participants.iter().map(|b| b.amount).sum();
    let winners: Vec<&Bet> = participants
        .iter()
        .copied()
        .filter(|b| is_winner(b.prediction, observed, threshold))
        .collect();

    let share = fees.winner_share(fees.distributable_pool(total_pool), winners.len());

    let outcomes = participants
        .iter()
        .map(|bet| {
            if is_winner(bet.prediction, observed, threshold) {
                let gross = bet.amount + share;
                BetOutcome {
                    bet_id: bet.id,
                    status: BetStatus::Won,
                    payout: Some(fees.net_payout(gross)),
                    fee_on_win: Some(fees.win_fee(gross)),
                }
            } else {
                BetOutcome {
                    bet_id: bet.id,
                    status: BetStatus::Lost,
                    payout: None,
                    fee_on_win: None,
                }
            }
        })
        .collect();

    SettlementPlan {
        result_value: observed,
        settled_at,
        outcomes,
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SettlementEngine {
    ledger: Arc<Ledger>,
    metrics: Arc<dyn MetricsProvider>,
    transfers: Arc<dyn TransferCapability>,
    fees: FeePolicy,
    escrow_account: String,
    treasury_account: String,
}

impl SettlementEngine {
    pub fn new(
        ledger: Arc<Ledger>,
        metrics: Arc<dyn MetricsProvider>,
        transfers: Arc<dyn TransferCapability>,
        fees: FeePolicy,
        escrow_account: String,
        treasury_account: String,
    ) -> Self {
        Self {
            ledger,
            metrics,
            transfers,
            fees,
            escrow_account,
            treasury_account,
        }
    }

    /// Settle one market.
    ///
    /// A metrics-provider failure returns `ProviderUnavailable` and leaves
    /// the market `active` for a later retry — never "observed value 0".
    pub async fn settle(&self, market_id: i64) -> Result<(Market, Vec<Bet>), MarketError> {
        let market = self.ledger.market(market_id).await?;
        if market.status != MarketStatus::Active {
            return Err(MarketError::InvalidState(format!(
                "market {} is {}",
                market.id, market.status
            )));
        }
        let now = chrono::Utc::now();
        if !market.is_expired(now) {
            return Err(MarketError::InvalidState(format!(
                "market {} has not reached its end time",
                market.id
            )));
        }

        // Fetched before the transaction; a provider stall must not hold
        // the ledger's write lock.
        let observed = self
            .metrics
            .fetch_metric(market.subject_fid, market.metric)
            .await?;

        let fees = self.fees.clone();
        let threshold = market.threshold;
        let (market, bets) = self
            .ledger
            .settle_market(market_id, move |_, bets| {
                Ok(build_plan(&fees, bets, observed, now, threshold))
            })
            .await?;

        let winners = bets.iter().filter(|b| b.status == BetStatus::Won).count();
        info!(
            market_id,
            observed = %observed,
            winners,
            pool = %market.total_pool,
            "Market settled"
        );

        self.route_win_fees(&bets).await;
        Ok((market, bets))
    }

    /// Settle every expired active market; failures are logged and skipped
    /// so one stuck market never blocks the sweep.
    pub async fn settle_due(&self) -> Result<Vec<i64>, MarketError> {
        let due = self
            .ledger
            .expired_active_markets(chrono::Utc::now())
            .await?;
        let mut settled = Vec::new();
        for market in due {
            match self.settle(market.id).await {
                Ok(_) => settled.push(market.id),
                Err(e) => warn!(market_id = market.id, error = %e, "Settlement deferred"),
            }
        }
        Ok(settled)
    }

    /// Win-fee transfers, escrow to treasury, one per winner. Best-effort:
    /// the settlement bookkeeping is already committed and authoritative,
    /// so a declined transfer is logged for out-of-band reconciliation.
    async fn route_win_fees(&self, bets: &[Bet]) {
        let transfers = bets
            .iter()
            .filter(|b| b.status == BetStatus::Won)
            .filter_map(|b| b.fee_on_win.map(|fee| (b.id, fee)))
            .filter(|(_, fee)| !fee.is_zero())
            .map(|(bet_id, fee)| {
                let memo = format!("winfee-bet-{bet_id}");
                async move {
                    let result = self
                        .transfers
                        .transfer(&self.escrow_account, &self.treasury_account, fee, &memo)
                        .await;
                    (bet_id, fee, result)
                }
            });

        for (bet_id, fee, result) in join_all(transfers).await {
            match result {
                Ok(receipt) => {
                    info!(bet_id, %fee, reference = %receipt.reference, "Win fee routed")
                }
                Err(e) => warn!(bet_id, %fee, error = %e, "Win fee transfer failed"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
