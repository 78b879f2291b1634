//! End-to-end lifecycle tests: market creation through bet placement,
//! settlement, balance derivation, and withdrawal, over an in-memory
//! ledger and deterministic providers.

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use castmarket::accounting::Accountant;
use castmarket::fees::FeePolicy;
use castmarket::ledger::Ledger;
use castmarket::market::MarketService;
use castmarket::profiles::ProfileService;
use castmarket::providers::TransferCapability;
use castmarket::settlement::SettlementEngine;
use castmarket::types::{
    BetStatus, Direction, Fid, Market, MarketError, MarketStatus, MetricKind, NewBet, NewMarket,
    WithdrawalStatus,
};
use castmarket::withdrawal::WithdrawalProcessor;

use crate::mock_providers::{RecordingTransfers, ScriptedMetrics, StaticIdentity};

const ESCROW: &str = "escrow";
const TREASURY: &str = "treasury";

/// The full service stack over shared deterministic providers.
struct World {
    ledger: Arc<Ledger>,
    metrics: Arc<ScriptedMetrics>,
    transfers: Arc<RecordingTransfers>,
    identity: Arc<StaticIdentity>,
    markets: MarketService,
    settlement: SettlementEngine,
    accountant: Accountant,
    withdrawals: WithdrawalProcessor,
    profiles: ProfileService,
}

impl World {
    async fn new() -> Self {
        let ledger = Arc::new(Ledger::in_memory().await.unwrap());
        let metrics = Arc::new(ScriptedMetrics::new());
        let transfers = Arc::new(RecordingTransfers::new());
        let identity = Arc::new(StaticIdentity::new());
        let fees = FeePolicy::default();
        let accountant = Accountant::new(ledger.clone());

        Self {
            markets: MarketService::new(
                ledger.clone(),
                transfers.clone(),
                fees.clone(),
                ESCROW.into(),
                TREASURY.into(),
                1,
                168,
            ),
            settlement: SettlementEngine::new(
                ledger.clone(),
                metrics.clone(),
                transfers.clone(),
                fees,
                ESCROW.into(),
                TREASURY.into(),
            ),
            withdrawals: WithdrawalProcessor::new(
                ledger.clone(),
                accountant.clone(),
                transfers.clone(),
                ESCROW.into(),
            ),
            profiles: ProfileService::new(
                ledger.clone(),
                identity.clone(),
                Duration::from_secs(300),
            ),
            accountant,
            ledger,
            metrics,
            transfers,
            identity,
        }
    }

    /// A market already past its end time, with bets backdated before it.
    async fn expired_market(&self, subject: Fid, threshold: Decimal) -> Market {
        let now = Utc::now();
        self.ledger
            .create_market(NewMarket {
                subject_fid: subject,
                metric: MetricKind::CastsCount,
                threshold,
                direction: Direction::Over,
                created_at: now - ChronoDuration::hours(25),
                end_time: now - ChronoDuration::hours(1),
            })
            .await
            .unwrap()
    }

    async fn backdated_bet(&self, market_id: i64, fid: Fid, amount: Decimal, p: Direction) -> i64 {
        self.ledger
            .insert_bet(NewBet {
                market_id,
                bettor_fid: fid,
                wallet: format!("wallet-{fid}"),
                prediction: p,
                amount,
                base_fee: dec!(0.2),
                transfer_ref: uuid::Uuid::new_v4().to_string(),
                placed_at: Utc::now() - ChronoDuration::hours(2),
            })
            .await
            .unwrap()
            .id
    }
}

// ---------------------------------------------------------------------------
// The reference scenario, end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_lifecycle_reference_scenario() {
    let world = World::new().await;

    // Bets 10/15/20 (over, over, under) against threshold 20.
    let market = world.expired_market(42, dec!(20)).await;
    let bet_a = world.backdated_bet(market.id, 7, dec!(10), Direction::Over).await;
    let bet_b = world.backdated_bet(market.id, 8, dec!(15), Direction::Over).await;
    let bet_c = world.backdated_bet(market.id, 9, dec!(20), Direction::Under).await;

    world.metrics.set_value(42, MetricKind::CastsCount, dec!(25));
    let (settled, bets) = world.settlement.settle(market.id).await.unwrap();

    assert_eq!(settled.status, MarketStatus::Settled);
    assert_eq!(settled.result_value, Some(dec!(25)));
    assert_eq!(settled.total_pool, dec!(45));

    // Winner A: gross 10 + 15.75 = 25.75 → fee 0.38625, net 25.36375.
    let a = bets.iter().find(|b| b.id == bet_a).unwrap();
    assert_eq!(a.status, BetStatus::Won);
    assert_eq!(a.payout, Some(dec!(25.36375)));
    assert_eq!(a.fee_on_win, Some(dec!(0.38625)));

    // Winner B: gross 15 + 15.75 = 30.75 → fee 0.46125, net 30.28875.
    let b = bets.iter().find(|b| b.id == bet_b).unwrap();
    assert_eq!(b.payout, Some(dec!(30.28875)));
    assert_eq!(b.fee_on_win, Some(dec!(0.46125)));

    let c = bets.iter().find(|b| b.id == bet_c).unwrap();
    assert_eq!(c.status, BetStatus::Lost);
    assert!(c.payout.is_none());

    // Σ (payout + fee) over winners == Σ winner stakes + distributable.
    let distributed: Decimal = bets
        .iter()
        .filter(|b| b.status == BetStatus::Won)
        .map(|b| b.payout.unwrap() + b.fee_on_win.unwrap())
        .sum();
    assert_eq!(distributed, dec!(25) + dec!(31.5));

    // Win fees routed escrow → treasury, one per winner.
    let fee_transfers = world.transfers.records_with_memo_prefix("winfee-bet-");
    assert_eq!(fee_transfers.len(), 2);
    assert!(fee_transfers.iter().all(|t| t.from == ESCROW && t.to == TREASURY));
    assert_eq!(world.transfers.received_by(TREASURY), dec!(0.8475));

    // Winner A's balance, then a 10.0 withdrawal.
    assert_eq!(world.accountant.balance(7).await.unwrap(), dec!(25.36375));

    let w = world
        .withdrawals
        .request_withdrawal(7, "wallet-7", dec!(10))
        .await
        .unwrap();
    let w = world.withdrawals.process_withdrawal(w.id).await.unwrap();
    assert_eq!(w.status, WithdrawalStatus::Completed);

    assert_eq!(world.accountant.balance(7).await.unwrap(), dec!(15.36375));

    // Payout used the idempotency memo tied to the withdrawal id.
    let payouts = world
        .transfers
        .records_with_memo_prefix(&format!("withdrawal-{}", w.id));
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount, dec!(10));
    assert_eq!(payouts[0].to, "wallet-7");

    // The loser has nothing to withdraw.
    assert_eq!(world.accountant.balance(9).await.unwrap(), Decimal::ZERO);
    assert!(matches!(
        world.withdrawals.request_withdrawal(9, "wallet-9", dec!(1)).await,
        Err(MarketError::InsufficientBalance { .. })
    ));
}

// ---------------------------------------------------------------------------
// Settlement edge cases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_tie_settles_every_bet_lost() {
    let world = World::new().await;
    let market = world.expired_market(42, dec!(20)).await;
    world.backdated_bet(market.id, 7, dec!(10), Direction::Over).await;
    world.backdated_bet(market.id, 8, dec!(10), Direction::Under).await;

    world.metrics.set_value(42, MetricKind::CastsCount, dec!(20));
    let (_, bets) = world.settlement.settle(market.id).await.unwrap();

    assert!(bets.iter().all(|b| b.status == BetStatus::Lost));
    assert!(bets.iter().all(|b| b.payout.is_none()));
    assert!(world.transfers.records().is_empty());
}

#[tokio::test]
async fn test_zero_winners_forfeits_pool_to_house() {
    let world = World::new().await;
    let market = world.expired_market(42, dec!(20)).await;
    world.backdated_bet(market.id, 7, dec!(10), Direction::Over).await;
    world.backdated_bet(market.id, 8, dec!(15), Direction::Over).await;

    // Both bets are over; observed value under the threshold.
    world.metrics.set_value(42, MetricKind::CastsCount, dec!(5));
    let (settled, bets) = world.settlement.settle(market.id).await.unwrap();

    assert_eq!(settled.status, MarketStatus::Settled);
    assert!(bets.iter().all(|b| b.status == BetStatus::Lost));
    assert!(world.transfers.records().is_empty());
    assert_eq!(world.accountant.balance(7).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn test_provider_outage_defers_settlement() {
    let world = World::new().await;
    let market = world.expired_market(42, dec!(20)).await;
    world.backdated_bet(market.id, 7, dec!(10), Direction::Over).await;

    world.metrics.set_error("hub unreachable");
    let err = world.settlement.settle(market.id).await.unwrap_err();
    assert!(matches!(err, MarketError::ProviderUnavailable(_)));
    assert_eq!(
        world.ledger.market(market.id).await.unwrap().status,
        MarketStatus::Active
    );

    // Recovery: the same market settles on retry.
    world.metrics.clear_error();
    world.metrics.set_value(42, MetricKind::CastsCount, dec!(25));
    let (settled, _) = world.settlement.settle(market.id).await.unwrap();
    assert_eq!(settled.status, MarketStatus::Settled);
}

#[tokio::test]
async fn test_second_settle_rejected_and_payouts_stable() {
    let world = World::new().await;
    let market = world.expired_market(42, dec!(20)).await;
    let bet = world.backdated_bet(market.id, 7, dec!(10), Direction::Over).await;

    world.metrics.set_value(42, MetricKind::CastsCount, dec!(25));
    world.settlement.settle(market.id).await.unwrap();
    let first = world.ledger.bet(bet).await.unwrap().payout;

    let err = world.settlement.settle(market.id).await.unwrap_err();
    assert!(matches!(err, MarketError::InvalidState(_)));
    assert_eq!(world.ledger.bet(bet).await.unwrap().payout, first);

    // Exactly one win-fee transfer ever happened.
    assert_eq!(world.transfers.records_with_memo_prefix("winfee-bet-").len(), 1);
}

#[tokio::test]
async fn test_settle_due_sweep() {
    let world = World::new().await;
    let expired = world.expired_market(42, dec!(20)).await;
    world.backdated_bet(expired.id, 7, dec!(10), Direction::Over).await;
    world.metrics.set_value(42, MetricKind::CastsCount, dec!(25));

    let open = world
        .markets
        .create_market(43, MetricKind::LikesTotal, dec!(100), Direction::Over, 24)
        .await
        .unwrap();

    let settled = world.settlement.settle_due().await.unwrap();
    assert_eq!(settled, vec![expired.id]);
    assert_eq!(
        world.ledger.market(open.id).await.unwrap().status,
        MarketStatus::Active
    );
}

// ---------------------------------------------------------------------------
// Placement money movement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_placement_charges_stake_and_routes_base_fee() {
    let world = World::new().await;
    let market = world
        .markets
        .create_market(42, MetricKind::CastsCount, dec!(20), Direction::Over, 24)
        .await
        .unwrap();

    world
        .markets
        .place_bet(market.id, 7, "wallet-7", Direction::Over, dec!(10))
        .await
        .unwrap();

    let records = world.transfers.records();
    assert_eq!(records.len(), 2);

    // Stake + base fee into escrow.
    assert_eq!(records[0].from, "wallet-7");
    assert_eq!(records[0].to, ESCROW);
    assert_eq!(records[0].amount, dec!(10.2));

    // Base fee onward to the treasury.
    assert_eq!(records[1].from, ESCROW);
    assert_eq!(records[1].to, TREASURY);
    assert_eq!(records[1].amount, dec!(0.2));
    assert!(records[1].memo.starts_with("basefee-bet-"));
}

#[tokio::test]
async fn test_placement_payment_failure_leaves_no_trace() {
    let world = World::new().await;
    let market = world
        .markets
        .create_market(42, MetricKind::CastsCount, dec!(20), Direction::Over, 24)
        .await
        .unwrap();

    world.transfers.set_error("card declined");
    let err = world
        .markets
        .place_bet(market.id, 7, "wallet-7", Direction::Over, dec!(10))
        .await
        .unwrap_err();
    assert!(matches!(err, MarketError::PaymentFailed(_)));

    assert!(world.markets.bets_for_user(7).await.unwrap().is_empty());
    assert_eq!(
        world.ledger.market(market.id).await.unwrap().total_pool,
        Decimal::ZERO
    );
    assert!(world.transfers.records().is_empty());
}

#[tokio::test]
async fn test_cancel_refunds_stakes_not_fees() {
    let world = World::new().await;
    let market = world
        .markets
        .create_market(42, MetricKind::CastsCount, dec!(20), Direction::Over, 24)
        .await
        .unwrap();
    world
        .markets
        .place_bet(market.id, 7, "wallet-7", Direction::Over, dec!(10))
        .await
        .unwrap();

    world.markets.cancel_market(market.id).await.unwrap();

    let refunds = world.transfers.records_with_memo_prefix("refund-bet-");
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, dec!(10)); // stake only, base fee kept
    assert_eq!(refunds[0].to, "wallet-7");

    // Cancelled markets cannot be settled.
    world.metrics.set_value(42, MetricKind::CastsCount, dec!(25));
    assert!(matches!(
        world.settlement.settle(market.id).await,
        Err(MarketError::InvalidState(_))
    ));
}

// ---------------------------------------------------------------------------
// Transfer idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_repeated_memo_does_not_double_pay() {
    let world = World::new().await;
    let r1 = world
        .transfers
        .transfer(ESCROW, "wallet-7", dec!(10), "withdrawal-1")
        .await
        .unwrap();
    let r2 = world
        .transfers
        .transfer(ESCROW, "wallet-7", dec!(10), "withdrawal-1")
        .await
        .unwrap();

    assert_eq!(r1.reference, r2.reference);
    assert_eq!(world.transfers.received_by("wallet-7"), dec!(10));
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_profile_lazily_created_from_identity_provider() {
    let world = World::new().await;
    world.identity.add_user(42, "alice", "0xabc", 1200);

    let profile = world.profiles.get_or_fetch(42).await.unwrap();
    assert_eq!(profile.username.as_deref(), Some("alice"));
    assert_eq!(profile.followers_count, 1200);

    // Persisted on first reference.
    assert!(world.ledger.profile(42).await.unwrap().is_some());

    assert!(matches!(
        world.profiles.get_or_fetch(99).await,
        Err(MarketError::UserNotFound(99))
    ));
}
