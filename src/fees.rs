//! Fee policy — every monetary constant and derivation in one place.
//!
//! Nothing outside this module computes a fee or a pool split. The policy
//! is a plain value type so alternate schedules can be loaded from config
//! and passed around freely.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

/// Decimal places all monetary results are rounded to.
const MONEY_SCALE: u32 = 6;

/// Round a monetary value to the canonical scale, half to even.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// All fee and limit parameters for the market.
///
/// `base_fee` is a flat amount; `win_fee_rate` and `house_cut` are rates
/// in [0, 1).
#[derive(Debug, Clone, Deserialize)]
pub struct FeePolicy {
    /// Flat fee charged on top of every stake at placement.
    pub base_fee: Decimal,
    /// Rate applied to a winner's gross payout.
    pub win_fee_rate: Decimal,
    /// Share of the pool retained by the house at settlement.
    pub house_cut: Decimal,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
}

impl Default for FeePolicy {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            base_fee: dec!(0.2),
            win_fee_rate: dec!(0.015),
            house_cut: dec!(0.30),
            min_bet: dec!(1),
            max_bet: dec!(1000),
        }
    }
}

impl FeePolicy {
    /// Whether a stake amount is within the allowed band.
    pub fn stake_in_bounds(&self, amount: Decimal) -> bool {
        amount >= self.min_bet && amount <= self.max_bet
    }

    /// Total the bettor is charged at placement: stake plus flat fee.
    pub fn total_cost(&self, amount: Decimal) -> Decimal {
        round_money(amount + self.base_fee)
    }

    /// Win fee on a gross payout.
    pub fn win_fee(&self, gross_payout: Decimal) -> Decimal {
        round_money(gross_payout * self.win_fee_rate)
    }

    /// Net payout after the win fee.
    pub fn net_payout(&self, gross_payout: Decimal) -> Decimal {
        round_money(gross_payout - self.win_fee(gross_payout))
    }

    /// The house's share of a settled pool.
    pub fn house_share(&self, total_pool: Decimal) -> Decimal {
        round_money(total_pool * self.house_cut)
    }

    /// What remains of the pool for winners after the house share.
    pub fn distributable_pool(&self, total_pool: Decimal) -> Decimal {
        round_money(total_pool - self.house_share(total_pool))
    }

    /// Each winner's equal slice of the distributable pool. The split is
    /// flat per winner, independent of stake size.
    pub fn winner_share(&self, distributable: Decimal, winner_count: usize) -> Decimal {
        if winner_count == 0 {
            return Decimal::ZERO;
        }
        round_money(distributable / Decimal::from(winner_count as u64))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
