use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::error::SettlementError;
use super::resolution::ResultRecord;

/// Fee balance and per-account claim state for settled batches.
///
/// Results are posted exactly once by a resolution; claim latches and the
/// fee balance are only ever written here. Ordered maps keep the serialized
/// snapshot, and with it the state digest, deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscrowLedger {
    /// batch id -> account -> settled result.
    results: BTreeMap<u64, BTreeMap<String, ResultRecord>>,

    /// batch id -> accounts that already claimed.
    claims: BTreeMap<u64, BTreeSet<String>>,

    /// Accumulated fee balance pending admin withdrawal.
    available_fee: u64,
}

impl EscrowLedger {
    pub fn available(&self) -> u64 {
        self.available_fee
    }

    /// Settled outcome for one account. A zero-valued losing record stands
    /// in for both "not a winner" and "batch not resolved yet".
    pub fn result(&self, account: &str, batch_id: u64) -> ResultRecord {
        self.results
            .get(&batch_id)
            .and_then(|by_account| by_account.get(account))
            .cloned()
            .unwrap_or_else(ResultRecord::losing)
    }

    pub fn claimed(&self, account: &str, batch_id: u64) -> bool {
        self.claims
            .get(&batch_id)
            .map_or(false, |accounts| accounts.contains(account))
    }

    pub(crate) fn accrue_fee(&mut self, amount: u64) {
        self.available_fee += amount;
    }

    pub(crate) fn post_results(&mut self, batch_id: u64, results: Vec<(String, ResultRecord)>) {
        self.results.insert(batch_id, results.into_iter().collect());
    }

    /// Latch the caller's one-time claim and return its payout.
    pub fn withdraw_win(&mut self, batch_id: u64, caller: &str) -> Result<u64, SettlementError> {
        let record = self.result(caller, batch_id);
        if !record.is_winner {
            return Err(SettlementError::NotWinner);
        }
        if self.claimed(caller, batch_id) {
            return Err(SettlementError::AlreadyClaimed);
        }

        self.claims
            .entry(batch_id)
            .or_default()
            .insert(caller.to_string());
        Ok(record.payout)
    }

    /// Sweep the whole fee balance.
    pub fn collect_fee(&mut self) -> Result<u64, SettlementError> {
        if self.available_fee == 0 {
            return Err(SettlementError::NothingToWithdraw);
        }
        let amount = self.available_fee;
        self.available_fee = 0;
        Ok(amount)
    }
}
