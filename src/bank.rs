// Account ledger standing in for the execution environment.
//
// Tracks balances in base units plus a typed record of every value movement
// and lifecycle event. The settlement engine itself never touches balances:
// the service debits payments before invoking it and credits payouts after,
// all inside the same lock hold.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    Deposit,
    Prediction,
    Payout,
    FeeCollect,
    BatchCreated,
    BatchResolved,
    Whitelist,
}

/// A single value movement or lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub account: String,
    pub amount: u64,
    pub batch_id: Option<u64>,
    pub timestamp: u64,
    pub description: Option<String>,
}

impl Transaction {
    pub fn new(tx_type: TxType, account: &str, amount: u64, now: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tx_type,
            account: account.to_string(),
            amount,
            batch_id: None,
            timestamp: now,
            description: None,
        }
    }

    pub fn deposit(account: &str, amount: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::Deposit, account, amount, now);
        tx.description = Some(format!("Deposit {} base units", amount));
        tx
    }

    pub fn prediction(account: &str, batch_id: u64, amount: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::Prediction, account, amount, now);
        tx.batch_id = Some(batch_id);
        tx.description = Some(format!("Paid {} into batch {}", amount, batch_id));
        tx
    }

    pub fn payout(account: &str, batch_id: u64, amount: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::Payout, account, amount, now);
        tx.batch_id = Some(batch_id);
        tx.description = Some(format!("Won {} from batch {}", amount, batch_id));
        tx
    }

    pub fn fee_collect(destination: &str, amount: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::FeeCollect, destination, amount, now);
        tx.description = Some(format!("Fee sweep of {} base units", amount));
        tx
    }

    pub fn batch_created(batch_id: u64, pair: &str, ticket_cost: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::BatchCreated, "SYSTEM", 0, now);
        tx.batch_id = Some(batch_id);
        tx.description = Some(format!(
            "Batch {} opened on {} at {} per ticket",
            batch_id, pair, ticket_cost
        ));
        tx
    }

    pub fn batch_resolved(batch_id: u64, price: u64, now: u64) -> Self {
        let mut tx = Self::new(TxType::BatchResolved, "SYSTEM", 0, now);
        tx.batch_id = Some(batch_id);
        tx.description = Some(format!("Batch {} settled at {}", batch_id, price));
        tx
    }

    pub fn whitelist(caller: &str, pair_count: usize, now: u64) -> Self {
        let mut tx = Self::new(TxType::Whitelist, caller, 0, now);
        tx.description = Some(format!("Whitelisted {} pair(s)", pair_count));
        tx
    }
}

/// Account balances plus the transaction log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bank {
    balances: BTreeMap<String, u64>,
    transactions: Vec<Transaction>,
}

impl Bank {
    pub fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit fresh funds to an account, creating it when unknown.
    pub fn deposit(&mut self, account: &str, amount: u64, now: u64) -> u64 {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        let new_balance = *balance;
        self.transactions.push(Transaction::deposit(account, amount, now));
        println!("📥 Deposit: {} received {}", account, amount);
        new_balance
    }

    /// Debit a payment, rejecting it outright when the balance cannot cover
    /// it. Returns the new balance.
    pub fn debit(&mut self, account: &str, amount: u64) -> Result<u64, String> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        if *balance < amount {
            return Err(format!("Insufficient balance: {} < {}", balance, amount));
        }
        *balance -= amount;
        Ok(*balance)
    }

    pub fn credit(&mut self, account: &str, amount: u64) -> u64 {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance += amount;
        *balance
    }

    /// Append a transaction record and hand it back for the response.
    pub fn record(&mut self, tx: Transaction) -> Transaction {
        self.transactions.push(tx.clone());
        tx
    }

    pub fn transactions_for(&self, account: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.account == account)
            .collect()
    }

    pub fn recent(&self, limit: usize) -> Vec<&Transaction> {
        self.transactions.iter().rev().take(limit).collect()
    }

    pub fn stats(&self) -> BankStats {
        let volume = |tx_type: TxType| -> u64 {
            self.transactions
                .iter()
                .filter(|tx| tx.tx_type == tx_type)
                .map(|tx| tx.amount)
                .sum()
        };

        BankStats {
            accounts: self.balances.len(),
            transactions: self.transactions.len(),
            prediction_volume: volume(TxType::Prediction),
            payout_volume: volume(TxType::Payout),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStats {
    pub accounts: usize,
    pub transactions: usize,
    pub prediction_volume: u64,
    pub payout_volume: u64,
}
