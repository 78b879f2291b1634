//! Balance accountant.
//!
//! A user's withdrawable balance is never stored; it is derived fresh from
//! the ledger on every call: winnings paid out minus withdrawals completed.
//! Per-user history is bounded, so the re-scan is cheap.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::ledger::Ledger;
use crate::types::{BetStatus, Fid, MarketError};

/// Aggregate betting record for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub fid: Fid,
    pub total_bets: usize,
    pub won_bets: usize,
    pub win_rate: Decimal,
    pub total_wagered: Decimal,
    pub total_winnings: Decimal,
    pub total_withdrawn: Decimal,
    pub balance: Decimal,
}

#[derive(Clone)]
pub struct Accountant {
    ledger: Arc<Ledger>,
}

impl Accountant {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Withdrawable balance: Σ payout over won bets − Σ amount over
    /// completed withdrawals. Pending and failed withdrawals don't count.
    pub async fn balance(&self, fid: Fid) -> Result<Decimal, MarketError> {
        let winnings = self.ledger.won_payout_total(fid).await?;
        let withdrawn = self.ledger.completed_withdrawal_total(fid).await?;
        Ok(winnings - withdrawn)
    }

    pub async fn stats(&self, fid: Fid) -> Result<UserStats, MarketError> {
        let bets = self.ledger.bets_for_user(fid).await?;
        let total_bets = bets.len();
        let won_bets = bets.iter().filter(|b| b.status == BetStatus::Won).count();
        let total_wagered: Decimal = bets.iter().map(|b| b.amount).sum();
        let total_winnings = self.ledger.won_payout_total(fid).await?;
        let total_withdrawn = self.ledger.completed_withdrawal_total(fid).await?;

        let win_rate = if total_bets == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(won_bets as u64) / Decimal::from(total_bets as u64)).round_dp(4)
        };

        Ok(UserStats {
            fid,
            total_bets,
            won_bets,
            win_rate,
            total_wagered,
            total_winnings,
            total_withdrawn,
            balance: total_winnings - total_withdrawn,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
