//! Deterministic providers for integration testing.
//!
//! In-memory implementations of the capability traits: metric values and
//! identities are scripted from test code, and every transfer is recorded
//! so tests can assert on the exact money movements.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use castmarket::providers::{
    IdentityProvider, IdentitySnapshot, MetricsProvider, TransferCapability, TransferReceipt,
};
use castmarket::types::{Fid, MarketError, MetricKind};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Scripted metric values keyed by (subject, metric kind).
pub struct ScriptedMetrics {
    values: Mutex<HashMap<(Fid, MetricKind), Decimal>>,
    force_error: Mutex<Option<String>>,
}

impl ScriptedMetrics {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            force_error: Mutex::new(None),
        }
    }

    pub fn set_value(&self, fid: Fid, metric: MetricKind, value: Decimal) {
        self.values.lock().unwrap().insert((fid, metric), value);
    }

    /// Force all subsequent fetches to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl MetricsProvider for ScriptedMetrics {
    async fn fetch_metric(
        &self,
        subject: Fid,
        metric: MetricKind,
    ) -> Result<Decimal, MarketError> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(MarketError::ProviderUnavailable(msg));
        }
        self.values
            .lock()
            .unwrap()
            .get(&(subject, metric))
            .copied()
            .ok_or_else(|| {
                MarketError::ProviderUnavailable(format!("no scripted value for fid {subject}"))
            })
    }
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// One recorded money movement.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub memo: String,
    pub reference: String,
}

/// Transfer rail that records every call and honours idempotency memos:
/// a repeated memo returns the original receipt instead of recording a
/// second movement.
pub struct RecordingTransfers {
    records: Mutex<Vec<TransferRecord>>,
    force_error: Mutex<Option<String>>,
}

impl RecordingTransfers {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
        }
    }

    /// Force all subsequent transfers to be declined.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    pub fn records(&self) -> Vec<TransferRecord> {
        self.records.lock().unwrap().clone()
    }

    /// All records whose memo starts with the given prefix.
    pub fn records_with_memo_prefix(&self, prefix: &str) -> Vec<TransferRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.memo.starts_with(prefix))
            .collect()
    }

    /// Net amount received by an account across all records.
    pub fn received_by(&self, account: &str) -> Decimal {
        self.records()
            .iter()
            .filter(|r| r.to == account)
            .map(|r| r.amount)
            .sum()
    }
}

#[async_trait]
impl TransferCapability for RecordingTransfers {
    async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Decimal,
        memo: &str,
    ) -> Result<TransferReceipt, MarketError> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(MarketError::PaymentFailed(msg));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.iter().find(|r| r.memo == memo) {
            return Ok(TransferReceipt {
                reference: existing.reference.clone(),
                completed_at: Utc::now(),
            });
        }

        let reference = Uuid::new_v4().to_string();
        records.push(TransferRecord {
            from: from_account.to_string(),
            to: to_account.to_string(),
            amount,
            memo: memo.to_string(),
            reference: reference.clone(),
        });
        Ok(TransferReceipt {
            reference,
            completed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Fixed identity directory.
pub struct StaticIdentity {
    users: Mutex<HashMap<Fid, IdentitySnapshot>>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_user(&self, fid: Fid, username: &str, wallet: &str, followers: i64) {
        self.users.lock().unwrap().insert(
            fid,
            IdentitySnapshot {
                fid,
                username: Some(username.to_string()),
                display_name: Some(username.to_string()),
                pfp_url: None,
                wallet: Some(wallet.to_string()),
                followers_count: followers,
                following_count: followers / 2,
            },
        );
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn lookup(&self, fid: Fid) -> Result<IdentitySnapshot, MarketError> {
        self.users
            .lock()
            .unwrap()
            .get(&fid)
            .cloned()
            .ok_or(MarketError::UserNotFound(fid))
    }
}
