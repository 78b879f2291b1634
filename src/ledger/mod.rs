//! Ledger store — the durable record of markets, bets, and withdrawals.
//!
//! SQLite via sqlx. Every multi-entity mutation runs in one transaction,
//! and transactions that depend on an entity's state open with a
//! conditional UPDATE on that state: the update takes SQLite's write lock
//! up front and its row count re-asserts the precondition, so a
//! check-then-act can never interleave with a concurrent writer.
//!
//! Money columns are TEXT holding exact decimal strings; timestamps are
//! RFC 3339 TEXT. All arithmetic happens in Rust on `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::types::{
    Bet, BetStatus, Fid, Market, MarketError, MarketStatus, NewBet, NewMarket, UserProfile,
    Withdrawal,
};

// ---------------------------------------------------------------------------
// Settlement plan
// ---------------------------------------------------------------------------

/// Terminal outcome for one bet, produced by the settlement engine and
/// applied by the ledger inside the settlement transaction.
#[derive(Debug, Clone)]
pub struct BetOutcome {
    pub bet_id: i64,
    pub status: BetStatus,
    pub payout: Option<Decimal>,
    pub fee_on_win: Option<Decimal>,
}

/// Everything a settlement writes: the market's terminal fields plus one
/// outcome per bet.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub result_value: Decimal,
    pub settled_at: DateTime<Utc>,
    pub outcomes: Vec<BetOutcome>,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Connect to the configured database and ensure the schema exists.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, MarketError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await?;
        let ledger = Self { pool };
        ledger.init_schema().await?;
        info!(url = %cfg.url, "Ledger connected");
        Ok(ledger)
    }

    /// In-memory ledger for tests. Single connection: each SQLite
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, MarketError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    async fn init_schema(&self) -> Result<(), MarketError> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS markets (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_fid  INTEGER NOT NULL,
                metric       TEXT    NOT NULL,
                threshold    TEXT    NOT NULL,
                direction    TEXT    NOT NULL,
                status       TEXT    NOT NULL,
                created_at   TEXT    NOT NULL,
                end_time     TEXT    NOT NULL,
                settled_at   TEXT,
                result_value TEXT,
                total_pool   TEXT    NOT NULL
            );

            CREATE TABLE IF NOT EXISTS bets (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id    INTEGER NOT NULL REFERENCES markets(id),
                bettor_fid   INTEGER NOT NULL,
                wallet       TEXT    NOT NULL,
                prediction   TEXT    NOT NULL,
                amount       TEXT    NOT NULL,
                base_fee     TEXT    NOT NULL,
                payout       TEXT,
                fee_on_win   TEXT,
                status       TEXT    NOT NULL,
                transfer_ref TEXT,
                placed_at    TEXT    NOT NULL,
                settled_at   TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_bets_market ON bets(market_id);
            CREATE INDEX IF NOT EXISTS idx_bets_bettor ON bets(bettor_fid);

            CREATE TABLE IF NOT EXISTS withdrawals (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                fid          INTEGER NOT NULL,
                wallet       TEXT    NOT NULL,
                amount       TEXT    NOT NULL,
                status       TEXT    NOT NULL,
                transfer_ref TEXT,
                error_detail TEXT,
                requested_at TEXT    NOT NULL,
                processed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_withdrawals_fid ON withdrawals(fid);

            CREATE TABLE IF NOT EXISTS profiles (
                fid             INTEGER PRIMARY KEY,
                username        TEXT,
                display_name    TEXT,
                pfp_url         TEXT,
                wallet          TEXT,
                followers_count INTEGER NOT NULL DEFAULT 0,
                following_count INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT    NOT NULL,
                updated_at      TEXT    NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // -- Markets ---------------------------------------------------------

    pub async fn create_market(&self, new: NewMarket) -> Result<Market, MarketError> {
        let result = sqlx::query(
            r#"
            INSERT INTO markets
                (subject_fid, metric, threshold, direction, status,
                 created_at, end_time, total_pool)
            VALUES (?, ?, ?, ?, 'active', ?, ?, '0')
            "#,
        )
        .bind(new.subject_fid)
        .bind(new.metric.to_string())
        .bind(new.threshold.to_string())
        .bind(new.direction.to_string())
        .bind(new.created_at.to_rfc3339())
        .bind(new.end_time.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(market_id = id, fid = new.subject_fid, "Market persisted");
        self.market(id).await
    }

    pub async fn market(&self, id: i64) -> Result<Market, MarketError> {
        let row = sqlx::query("SELECT * FROM markets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => market_from_row(&row),
            None => Err(MarketError::MarketNotFound(id)),
        }
    }

    pub async fn active_markets(&self) -> Result<Vec<Market>, MarketError> {
        let rows = sqlx::query("SELECT * FROM markets WHERE status = 'active' ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(market_from_row).collect()
    }

    /// Active markets whose end time has passed — settlement candidates.
    pub async fn expired_active_markets(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, MarketError> {
        let rows =
            sqlx::query("SELECT * FROM markets WHERE status = 'active' AND end_time <= ? ORDER BY id")
                .bind(now.to_rfc3339())
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(market_from_row).collect()
    }

    /// Administrative removal; cascades to the market's bets.
    pub async fn delete_market(&self, id: i64) -> Result<(), MarketError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM bets WHERE market_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM markets WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(MarketError::MarketNotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    // -- Bets ------------------------------------------------------------

    pub async fn bet(&self, id: i64) -> Result<Bet, MarketError> {
        let row = sqlx::query("SELECT * FROM bets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => bet_from_row(&row),
            None => Err(MarketError::BetNotFound(id)),
        }
    }

    pub async fn bets_for_market(&self, market_id: i64) -> Result<Vec<Bet>, MarketError> {
        let rows = sqlx::query("SELECT * FROM bets WHERE market_id = ? ORDER BY id")
            .bind(market_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(bet_from_row).collect()
    }

    pub async fn bets_for_user(&self, fid: Fid) -> Result<Vec<Bet>, MarketError> {
        let rows = sqlx::query("SELECT * FROM bets WHERE bettor_fid = ? ORDER BY id")
            .bind(fid)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(bet_from_row).collect()
    }

    /// Persist an accepted bet and grow the market pool, atomically.
    ///
    /// Fails `InvalidState` if the market is no longer active or has passed
    /// its end time by `new.placed_at` — the caller then owes the bettor a
    /// refund, since the stake was collected before this call.
    pub async fn insert_bet(&self, new: NewBet) -> Result<Bet, MarketError> {
        let mut tx = self.pool.begin().await?;

        // Takes the write lock and re-asserts the status in one statement.
        let guard = sqlx::query("UPDATE markets SET status = 'active' WHERE id = ? AND status = 'active'")
            .bind(new.market_id)
            .execute(&mut *tx)
            .await?;
        if guard.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.market_state_error(new.market_id).await);
        }

        let row = sqlx::query("SELECT * FROM markets WHERE id = ?")
            .bind(new.market_id)
            .fetch_one(&mut *tx)
            .await?;
        let market = market_from_row(&row)?;
        if market.is_expired(new.placed_at) {
            tx.rollback().await?;
            return Err(MarketError::InvalidState(format!(
                "market {} is past its end time",
                market.id
            )));
        }

        let new_pool = market.total_pool + new.amount;
        sqlx::query("UPDATE markets SET total_pool = ? WHERE id = ?")
            .bind(new_pool.to_string())
            .bind(new.market_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO bets
                (market_id, bettor_fid, wallet, prediction, amount, base_fee,
                 status, transfer_ref, placed_at)
            VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?)
            "#,
        )
        .bind(new.market_id)
        .bind(new.bettor_fid)
        .bind(&new.wallet)
        .bind(new.prediction.to_string())
        .bind(new.amount.to_string())
        .bind(new.base_fee.to_string())
        .bind(&new.transfer_ref)
        .bind(new.placed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        debug!(bet_id = id, market_id = new.market_id, fid = new.bettor_fid, "Bet persisted");
        self.bet(id).await
    }

    // -- Settlement ------------------------------------------------------

    /// Settle a market in one transaction.
    ///
    /// The transaction opens with a conditional status UPDATE: a second
    /// settle attempt finds zero rows and fails `InvalidState` without
    /// touching any bet. `build_plan` runs against the bet set read under
    /// the write lock, so no placement can interleave.
    pub async fn settle_market<F>(
        &self,
        market_id: i64,
        build_plan: F,
    ) -> Result<(Market, Vec<Bet>), MarketError>
    where
        F: FnOnce(&Market, &[Bet]) -> Result<SettlementPlan, MarketError>,
    {
        let mut tx = self.pool.begin().await?;

        let guard =
            sqlx::query("UPDATE markets SET status = 'settled' WHERE id = ? AND status = 'active'")
                .bind(market_id)
                .execute(&mut *tx)
                .await?;
        if guard.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.market_state_error(market_id).await);
        }

        let row = sqlx::query("SELECT * FROM markets WHERE id = ?")
            .bind(market_id)
            .fetch_one(&mut *tx)
            .await?;
        let mut market = market_from_row(&row)?;
        // The guard already flipped the row; present the pre-settlement
        // view to the plan builder.
        market.status = MarketStatus::Active;

        let bet_rows = sqlx::query("SELECT * FROM bets WHERE market_id = ? ORDER BY id")
            .bind(market_id)
            .fetch_all(&mut *tx)
            .await?;
        let bets: Vec<Bet> = bet_rows
            .iter()
            .map(bet_from_row)
            .collect::<Result<_, _>>()?;

        let plan = build_plan(&market, &bets)?;

        for outcome in &plan.outcomes {
            sqlx::query(
                "UPDATE bets SET status = ?, payout = ?, fee_on_win = ?, settled_at = ? WHERE id = ?",
            )
            .bind(outcome.status.to_string())
            .bind(outcome.payout.map(|p| p.to_string()))
            .bind(outcome.fee_on_win.map(|f| f.to_string()))
            .bind(plan.settled_at.to_rfc3339())
            .bind(outcome.bet_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE markets SET settled_at = ?, result_value = ? WHERE id = ?")
            .bind(plan.settled_at.to_rfc3339())
            .bind(plan.result_value.to_string())
            .bind(market_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let market = self.market(market_id).await?;
        let bets = self.bets_for_market(market_id).await?;
        info!(market_id, result = %plan.result_value, "Market settled in ledger");
        Ok((market, bets))
    }

    /// Cancel a market and its unsettled bets; returns the bets that were
    /// cancelled so the caller can emit stake refunds.
    pub async fn cancel_market(&self, market_id: i64) -> Result<Vec<Bet>, MarketError> {
        let mut tx = self.pool.begin().await?;

        let guard = sqlx::query(
            "UPDATE markets SET status = 'cancelled' WHERE id = ? AND status = 'active'",
        )
        .bind(market_id)
        .execute(&mut *tx)
        .await?;
        if guard.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.market_state_error(market_id).await);
        }

        let rows = sqlx::query("SELECT * FROM bets WHERE market_id = ? AND status = 'active' ORDER BY id")
            .bind(market_id)
            .fetch_all(&mut *tx)
            .await?;
        let affected: Vec<Bet> = rows.iter().map(bet_from_row).collect::<Result<_, _>>()?;

        sqlx::query("UPDATE bets SET status = 'cancelled' WHERE market_id = ? AND status = 'active'")
            .bind(market_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(market_id, bets = affected.len(), "Market cancelled");
        Ok(affected)
    }

    /// Distinguish "no such market" from "market in the wrong state" after
    /// a zero-row guard update.
    async fn market_state_error(&self, market_id: i64) -> MarketError {
        match self.market(market_id).await {
            Ok(market) => MarketError::InvalidState(format!(
                "market {} is {}",
                market.id, market.status
            )),
            Err(e) => e,
        }
    }

    // -- Withdrawals -----------------------------------------------------

    pub async fn insert_withdrawal(
        &self,
        fid: Fid,
        wallet: &str,
        amount: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Result<Withdrawal, MarketError> {
        let result = sqlx::query(
            r#"
            INSERT INTO withdrawals (fid, wallet, amount, status, requested_at)
            VALUES (?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(fid)
        .bind(wallet)
        .bind(amount.to_string())
        .bind(requested_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        self.withdrawal(result.last_insert_rowid()).await
    }

    pub async fn withdrawal(&self, id: i64) -> Result<Withdrawal, MarketError> {
        let row = sqlx::query("SELECT * FROM withdrawals WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => withdrawal_from_row(&row),
            None => Err(MarketError::WithdrawalNotFound(id)),
        }
    }

    pub async fn withdrawals_for_user(&self, fid: Fid) -> Result<Vec<Withdrawal>, MarketError> {
        let rows = sqlx::query("SELECT * FROM withdrawals WHERE fid = ? ORDER BY id")
            .bind(fid)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(withdrawal_from_row).collect()
    }

    /// Terminal-state write, guarded on `pending` so a double process call
    /// cannot overwrite a completed withdrawal.
    pub async fn complete_withdrawal(
        &self,
        id: i64,
        transfer_ref: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<Withdrawal, MarketError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = 'completed', transfer_ref = ?, processed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(transfer_ref)
        .bind(processed_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(self.withdrawal_state_error(id).await);
        }
        self.withdrawal(id).await
    }

    pub async fn fail_withdrawal(
        &self,
        id: i64,
        error_detail: &str,
        processed_at: DateTime<Utc>,
    ) -> Result<Withdrawal, MarketError> {
        let result = sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = 'failed', error_detail = ?, processed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(error_detail)
        .bind(processed_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(self.withdrawal_state_error(id).await);
        }
        self.withdrawal(id).await
    }

    async fn withdrawal_state_error(&self, id: i64) -> MarketError {
        match self.withdrawal(id).await {
            Ok(w) => MarketError::InvalidState(format!("withdrawal {} is {}", w.id, w.status)),
            Err(e) => e,
        }
    }

    // -- Balance reads ---------------------------------------------------

    /// Sum of payouts over a user's won bets.
    pub async fn won_payout_total(&self, fid: Fid) -> Result<Decimal, MarketError> {
        let rows = sqlx::query("SELECT payout FROM bets WHERE bettor_fid = ? AND status = 'won'")
            .bind(fid)
            .fetch_all(&self.pool)
            .await?;
        let mut total = Decimal::ZERO;
        for row in &rows {
            if let Some(p) = row.try_get::<Option<String>, _>("payout")? {
                total += parse_money(&p)?;
            }
        }
        Ok(total)
    }

    /// Sum of amounts over a user's completed withdrawals.
    pub async fn completed_withdrawal_total(&self, fid: Fid) -> Result<Decimal, MarketError> {
        self.withdrawal_total(fid, "completed").await
    }

    /// Sum of amounts over a user's pending withdrawals. Used to reserve
    /// in-flight requests against the withdrawable balance.
    pub async fn pending_withdrawal_total(&self, fid: Fid) -> Result<Decimal, MarketError> {
        self.withdrawal_total(fid, "pending").await
    }

    async fn withdrawal_total(&self, fid: Fid, status: &str) -> Result<Decimal, MarketError> {
        let rows = sqlx::query("SELECT amount FROM withdrawals WHERE fid = ? AND status = ?")
            .bind(fid)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        let mut total = Decimal::ZERO;
        for row in &rows {
            total += parse_money(&row.try_get::<String, _>("amount")?)?;
        }
        Ok(total)
    }

    // -- Profiles --------------------------------------------------------

    pub async fn profile(&self, fid: Fid) -> Result<Option<UserProfile>, MarketError> {
        let row = sqlx::query("SELECT * FROM profiles WHERE fid = ?")
            .bind(fid)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(profile_from_row).transpose()
    }

    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), MarketError> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (fid, username, display_name, pfp_url, wallet,
                 followers_count, following_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(fid) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                pfp_url = excluded.pfp_url,
                wallet = excluded.wallet,
                followers_count = excluded.followers_count,
                following_count = excluded.following_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.fid)
        .bind(&profile.username)
        .bind(&profile.display_name)
        .bind(&profile.pfp_url)
        .bind(&profile.wallet)
        .bind(profile.followers_count)
        .bind(profile.following_count)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_money(s: &str) -> Result<Decimal, MarketError> {
    Decimal::from_str(s).map_err(|e| MarketError::Storage(format!("bad decimal {s:?}: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, MarketError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| MarketError::Storage(format!("bad timestamp {s:?}: {e}")))
}

fn opt_money(value: Option<String>) -> Result<Option<Decimal>, MarketError> {
    value.as_deref().map(parse_money).transpose()
}

fn opt_time(value: Option<String>) -> Result<Option<DateTime<Utc>>, MarketError> {
    value.as_deref().map(parse_time).transpose()
}

fn market_from_row(row: &SqliteRow) -> Result<Market, MarketError> {
    Ok(Market {
        id: row.try_get("id")?,
        subject_fid: row.try_get("subject_fid")?,
        metric: row.try_get::<String, _>("metric")?.parse()?,
        threshold: parse_money(&row.try_get::<String, _>("threshold")?)?,
        direction: row.try_get::<String, _>("direction")?.parse()?,
        status: row.try_get::<String, _>("status")?.parse()?,
        created_at: parse_time(&row.try_get::<String, _>("created_at")?)?,
        end_time: parse_time(&row.try_get::<String, _>("end_time")?)?,
        settled_at: opt_time(row.try_get("settled_at")?)?,
        result_value: opt_money(row.try_get("result_value")?)?,
        total_pool: parse_money(&row.try_get::<String, _>("total_pool")?)?,
    })
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet, MarketError> {
    Ok(Bet {
        id: row.try_get("id")?,
        market_id: row.try_get("market_id")?,
        bettor_fid: row.try_get("bettor_fid")?,
        wallet: row.try_get("wallet")?,
        prediction: row.try_get::<String, _>("prediction")?.parse()?,
        amount: parse_money(&row.try_get::<String, _>("amount")?)?,
        base_fee: parse_money(&row.try_get::<String, _>("base_fee")?)?,
        payout: opt_money(row.try_get("payout")?)?,
        fee_on_win: opt_money(row.try_get("fee_on_win")?)?,
        status: row.try_get::<String, _>("status")?.parse()?,
        transfer_ref: row.try_get("transfer_ref")?,
        placed_at: parse_time(&row.try_get::<String, _>("placed_at")?)?,
        settled_at: opt_time(row.try_get("settled_at")?)?,
    })
}

fn withdrawal_from_row(row: &SqliteRow) -> Result<Withdrawal, MarketError> {
    Ok(Withdrawal {
        id: row.try_get("id")?,
        fid: row.try_get("fid")?,
        wallet: row.try_get("wallet")?,
        amount: parse_money(&row.try_get::<String, _>("amount")?)?,
        status: row.try_get::<String, _>("status")?.parse()?,
        transfer_ref: row.try_get("transfer_ref")?,
        error_detail: row.try_get("error_detail")?,
        requested_at: parse_time(&row.try_get::<String, _>("requested_at")?)?,
        processed_at: opt_time(row.try_get("processed_at")?)?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<UserProfile, MarketError> {
    Ok(UserProfile {
        fid: row.try_get("fid")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        pfp_url: row.try_get("pfp_url")?,
        wallet: row.try_get("wallet")?,
        followers_count: row.try_get("followers_count")?,
        following_count: row.try_get("following_count")?,
        created_at: parse_time(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_time(&row.try_get::<String, _>("updated_at")?)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
