//! Market/bet lifecycle controller.
//!
//! Owns the allowed state transitions and their preconditions: market
//! creation bounds, bet placement validation, stake collection, base-fee
//! routing, cancellation with refunds. Settlement lives in its own module;
//! this one never computes payouts.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::fees::FeePolicy;
use crate::ledger::Ledger;
use crate::providers::TransferCapability;
use crate::types::{
    Bet, Direction, Fid, Market, MarketError, MetricKind, NewBet, NewMarket,
};

pub struct MarketService {
    ledger: Arc<Ledger>,
    transfers: Arc<dyn TransferCapability>,
    fees: FeePolicy,
    escrow_account: String,
    treasury_account: String,
    min_duration_hours: i64,
    max_duration_hours: i64,
}

impl MarketService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<Ledger>,
        transfers: Arc<dyn TransferCapability>,
        fees: FeePolicy,
        escrow_account: String,
        treasury_account: String,
        min_duration_hours: i64,
        max_duration_hours: i64,
    ) -> Self {
        Self {
            ledger,
            transfers,
            fees,
            escrow_account,
            treasury_account,
            min_duration_hours,
            max_duration_hours,
        }
    }

    // -- Markets ---------------------------------------------------------

    pub async fn create_market(
        &self,
        subject_fid: Fid,
        metric: MetricKind,
        threshold: Decimal,
        direction: Direction,
        duration_hours: i64,
    ) -> Result<Market, MarketError> {
        if threshold < Decimal::ZERO {
            return Err(MarketError::InvalidAmount(format!(
                "threshold must be non-negative, got {threshold}"
            )));
        }
        if duration_hours < self.min_duration_hours || duration_hours > self.max_duration_hours {
            return Err(MarketError::InvalidDuration(duration_hours));
        }

        let now = Utc::now();
        let market = self
            .ledger
            .create_market(NewMarket {
                subject_fid,
                metric,
                threshold,
                direction,
                created_at: now,
                end_time: now + Duration::hours(duration_hours),
            })
            .await?;

        info!(market_id = market.id, fid = subject_fid, %metric, %threshold, "Market created");
        Ok(market)
    }

    pub async fn market(&self, id: i64) -> Result<Market, MarketError> {
        self.ledger.market(id).await
    }

    pub async fn list_active(&self) -> Result<Vec<Market>, MarketError> {
        self.ledger.active_markets().await
    }

    /// Cancel an active market; refunds each cancelled bet's stake from
    /// escrow, best-effort. The base fee is not refunded.
    pub async fn cancel_market(&self, id: i64) -> Result<Vec<Bet>, MarketError> {
        let cancelled = self.ledger.cancel_market(id).await?;

        for bet in &cancelled {
            let memo = format!("refund-bet-{}", bet.id);
            match self
                .transfers
                .transfer(&self.escrow_account, &bet.wallet, bet.amount, &memo)
                .await
            {
                Ok(receipt) => {
                    info!(bet_id = bet.id, amount = %bet.amount, reference = %receipt.reference, "Stake refunded")
                }
                Err(e) => warn!(bet_id = bet.id, error = %e, "Stake refund failed"),
            }
        }

        info!(market_id = id, bets = cancelled.len(), "Market cancelled");
        Ok(cancelled)
    }

    pub async fn delete_market(&self, id: i64) -> Result<(), MarketError> {
        self.ledger.delete_market(id).await
    }

    // -- Bets ------------------------------------------------------------

    pub async fn bet(&self, id: i64) -> Result<Bet, MarketError> {
        self.ledger.bet(id).await
    }

    pub async fn bets_for_user(&self, fid: Fid) -> Result<Vec<Bet>, MarketError> {
        self.ledger.bets_for_user(fid).await
    }

    pub async fn bets_for_market(&self, market_id: i64) -> Result<Vec<Bet>, MarketError> {
        // Existence check so an unknown market 404s instead of listing empty.
        self.ledger.market(market_id).await?;
        self.ledger.bets_for_market(market_id).await
    }

    /// Place a stake on one side of an open market.
    ///
    /// The full cost (stake + base fee) is charged from the bettor's
    /// wallet before anything is persisted; a declined or timed-out
    /// transfer aborts the placement with `PaymentFailed` and no bet row.
    /// If the market flips state between the charge and the insert, the
    /// charge is refunded best-effort.
    pub async fn place_bet(
        &self,
        market_id: i64,
        bettor_fid: Fid,
        wallet: &str,
        prediction: Direction,
        stake: Decimal,
    ) -> Result<Bet, MarketError> {
        let market = self.ledger.market(market_id).await?;
        let now = Utc::now();
        if !market.is_open(now) {
            return Err(MarketError::InvalidState(format!(
                "market {} is not accepting bets",
                market.id
            )));
        }
        if !self.fees.stake_in_bounds(stake) {
            return Err(MarketError::InvalidAmount(format!(
                "stake {stake} outside [{}, {}]",
                self.fees.min_bet, self.fees.max_bet
            )));
        }

        let total_cost = self.fees.total_cost(stake);
        let memo = format!("stake-{}", uuid::Uuid::new_v4());
        let receipt = self
            .transfers
            .transfer(wallet, &self.escrow_account, total_cost, &memo)
            .await?;

        let inserted = self
            .ledger
            .insert_bet(NewBet {
                market_id,
                bettor_fid,
                wallet: wallet.to_string(),
                prediction,
                amount: stake,
                base_fee: self.fees.base_fee,
                transfer_ref: receipt.reference.clone(),
                placed_at: now,
            })
            .await;

        let bet = match inserted {
            Ok(bet) => bet,
            Err(e) => {
                // The bettor has already paid; give the money back before
                // surfacing the state error.
                let refund_memo = format!("unwind-{memo}");
                if let Err(refund_err) = self
                    .transfers
                    .transfer(&self.escrow_account, wallet, total_cost, &refund_memo)
                    .await
                {
                    warn!(market_id, fid = bettor_fid, error = %refund_err, "Placement unwind refund failed");
                }
                return Err(e);
            }
        };

        // Second, independent transfer; the bettor has paid either way, so
        // a failure here is a reconciliation gap, not a placement failure.
        let fee_memo = format!("basefee-bet-{}", bet.id);
        if let Err(e) = self
            .transfers
            .transfer(
                &self.escrow_account,
                &self.treasury_account,
                self.fees.base_fee,
                &fee_memo,
            )
            .await
        {
            warn!(bet_id = bet.id, error = %e, "Base fee routing failed");
        }

        info!(
            bet_id = bet.id,
            market_id,
            fid = bettor_fid,
            %prediction,
            %stake,
            "Bet placed"
        );
        Ok(bet)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
