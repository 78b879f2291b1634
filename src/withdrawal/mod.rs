//! Withdrawal processor.
//!
//! Requests are balance-gated and serialized per user behind an async
//! lock; pending withdrawals count against the withdrawable balance, so
//! two concurrent requests cannot both fit the same funds. Processing
//! pays out with an idempotency
//! memo tied to the withdrawal id; the transfer rail resolves a retried
//! memo to the original transfer, never a second payment.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::accounting::Accountant;
use crate::ledger::Ledger;
use crate::providers::TransferCapability;
use crate::types::{Fid, MarketError, Withdrawal, WithdrawalStatus};

pub struct WithdrawalProcessor {
    ledger: Arc<Ledger>,
    accountant: Accountant,
    transfers: Arc<dyn TransferCapability>,
    escrow_account: String,
    user_locks: Mutex<HashMap<Fid, Arc<Mutex<()>>>>,
}

impl WithdrawalProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        accountant: Accountant,
        transfers: Arc<dyn TransferCapability>,
        escrow_account: String,
    ) -> Self {
        Self {
            ledger,
            accountant,
            transfers,
            escrow_account,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, fid: Fid) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(fid).or_default().clone()
    }

    /// Validate and persist a `pending` withdrawal.
    pub async fn request_withdrawal(
        &self,
        fid: Fid,
        wallet: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, MarketError> {
        if amount <= Decimal::ZERO {
            return Err(MarketError::InvalidAmount(format!(
                "withdrawal amount must be positive, got {amount}"
            )));
        }

        // Balance check and insert are atomic per user; pending requests
        // count against the balance here, otherwise two serialized
        // requests could each fit the same funds.
        let lock = self.user_lock(fid).await;
        let _guard = lock.lock().await;

        let balance = self.accountant.balance(fid).await?;
        let reserved = self.ledger.pending_withdrawal_total(fid).await?;
        let available = balance - reserved;
        if amount > available {
            return Err(MarketError::InsufficientBalance {
                requested: amount,
                available,
            });
        }

        let withdrawal = self
            .ledger
            .insert_withdrawal(fid, wallet, amount, Utc::now())
            .await?;
        info!(withdrawal_id = withdrawal.id, fid, %amount, "Withdrawal requested");
        Ok(withdrawal)
    }

    /// Execute a pending withdrawal's payout.
    ///
    /// A declined transfer transitions the withdrawal to `failed` with the
    /// error recorded, and that withdrawal is the return value — the rail
    /// failure is data here, not an error of this call.
    pub async fn process_withdrawal(&self, id: i64) -> Result<Withdrawal, MarketError> {
        let withdrawal = self.ledger.withdrawal(id).await?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(MarketError::InvalidState(format!(
                "withdrawal {} is {}",
                withdrawal.id, withdrawal.status
            )));
        }

        let memo = format!("withdrawal-{id}");
        match self
            .transfers
            .transfer(
                &self.escrow_account,
                &withdrawal.wallet,
                withdrawal.amount,
                &memo,
            )
            .await
        {
            Ok(receipt) => {
                let done = self
                    .ledger
                    .complete_withdrawal(id, &receipt.reference, Utc::now())
                    .await?;
                info!(withdrawal_id = id, reference = %receipt.reference, "Withdrawal completed");
                Ok(done)
            }
            Err(e) => {
                warn!(withdrawal_id = id, error = %e, "Withdrawal payout failed");
                self.ledger
                    .fail_withdrawal(id, &e.to_string(), Utc::now())
                    .await
            }
        }
    }

    pub async fn withdrawal(&self, id: i64) -> Result<Withdrawal, MarketError> {
        self.ledger.withdrawal(id).await
    }

    pub async fn withdrawals_for_user(&self, fid: Fid) -> Result<Vec<Withdrawal>, MarketError> {
        self.ledger.withdrawals_for_user(fid).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
