use serde::{Deserialize, Serialize};

use super::batches::Batch;
use super::error::SettlementError;

/// One priced submission of guesses by one account into one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub batch_id: u64,
    pub account: String,
    pub guesses: Vec<u64>,

    /// Global monotonic counter. Earlier submissions win distance ties.
    pub submission_order: u64,
}

/// Append-only store of guess entries.
///
/// Entries are never mutated; a repeat submission by the same account
/// creates an additional independent entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionBook {
    entries: Vec<Entry>,
    next_order: u64,
}

impl PredictionBook {
    /// Accept a paid submission into an open batch.
    ///
    /// The payment must equal `ticket_cost * guesses.len()` exactly; there
    /// is no overpayment tolerance and no refund path. All checks run
    /// before any write, so a rejection leaves batch and book untouched.
    pub fn submit(
        &mut self,
        batch: &mut Batch,
        account: &str,
        guesses: &[u64],
        payment: u64,
        now: u64,
    ) -> Result<(), SettlementError> {
        if guesses.is_empty() {
            return Err(SettlementError::EmptyGuesses);
        }
        if !batch.is_open(now) {
            return Err(SettlementError::MarketNotOpen(batch.id));
        }

        let expected = batch.ticket_cost as u128 * guesses.len() as u128;
        if payment as u128 != expected {
            return Err(SettlementError::WrongPaymentValue {
                expected: expected.min(u64::MAX as u128) as u64,
                got: payment,
            });
        }

        let order = self.next_order;
        self.next_order += 1;
        self.entries.push(Entry {
            batch_id: batch.id,
            account: account.to_string(),
            guesses: guesses.to_vec(),
            submission_order: order,
        });

        batch.entry_count += guesses.len() as u64;
        batch.record_payment(payment);
        Ok(())
    }

    pub fn entries_for(&self, batch_id: u64) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.batch_id == batch_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::batches::BatchLedger;

    fn open_batch() -> (BatchLedger, u64) {
        let mut ledger = BatchLedger::default();
        let id = ledger.create(100, 0, 1_000, "eth_usdt", 10_000).unwrap();
        (ledger, id)
    }

    #[test]
    fn test_submit_accumulates_counts_and_pool() {
        let (mut ledger, id) = open_batch();
        let mut book = PredictionBook::default();

        let batch = ledger.get_mut(id).unwrap();
        book.submit(batch, "alice", &[10, 20, 30], 300, 10_100).unwrap();
        book.submit(batch, "bob", &[40], 100, 10_200).unwrap();
        book.submit(batch, "alice", &[50, 60], 200, 10_300).unwrap();

        assert_eq!(batch.entry_count, 6);
        assert_eq!(batch.gross_pool, 600);
        assert_eq!(book.entries_for(id).count(), 3);

        let orders: Vec<u64> = book.entries_for(id).map(|e| e.submission_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_exact_payment_required() {
        let (mut ledger, id) = open_batch();
        let mut book = PredictionBook::default();
        let batch = ledger.get_mut(id).unwrap();

        // Underpayment, overpayment, and zero all rejected.
        for payment in [0u64, 299, 301] {
            assert_eq!(
                book.submit(batch, "alice", &[10, 20, 30], payment, 10_100),
                Err(SettlementError::WrongPaymentValue {
                    expected: 300,
                    got: payment
                })
            );
        }

        assert_eq!(batch.entry_count, 0);
        assert_eq!(batch.gross_pool, 0);
        assert!(book.is_empty());
    }

    #[test]
    fn test_window_enforced() {
        let (mut ledger, id) = open_batch();
        let mut book = PredictionBook::default();
        let batch = ledger.get_mut(id).unwrap();

        assert_eq!(
            book.submit(batch, "alice", &[10], 100, 9_999),
            Err(SettlementError::MarketNotOpen(id))
        );
        // closes_at itself is outside the window.
        assert_eq!(
            book.submit(batch, "alice", &[10], 100, 11_000),
            Err(SettlementError::MarketNotOpen(id))
        );
        assert!(book.submit(batch, "alice", &[10], 100, 10_000).is_ok());
    }

    #[test]
    fn test_empty_guesses_rejected() {
        let (mut ledger, id) = open_batch();
        let mut book = PredictionBook::default();
        let batch = ledger.get_mut(id).unwrap();

        // ticket_cost * 0 == 0 would make a free empty entry arithmetically
        // valid, so the empty sequence is rejected outright.
        assert_eq!(
            book.submit(batch, "alice", &[], 0, 10_100),
            Err(SettlementError::EmptyGuesses)
        );
        assert!(book.is_empty());
    }
}
