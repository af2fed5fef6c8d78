use serde::{Deserialize, Serialize};

use super::error::SettlementError;

/// One prediction round over a symbol pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Sequence number, assigned at creation, starting at 1. Never reused.
    pub id: u64,

    /// Price of a single guess in base units. Immutable after creation.
    pub ticket_cost: u64,

    /// Total number of individual guesses submitted (not submitting accounts).
    pub entry_count: u64,

    /// Cumulative payment received. Gross intake: never reduced by the fee
    /// or by winner payouts.
    pub gross_pool: u64,

    /// Distributable pool, set once at resolution (gross intake minus fee).
    pub prize_pool: u64,

    /// First instant predictions are accepted.
    pub opens_at: u64,

    /// Deadline: predictions close here and resolution becomes possible.
    pub closes_at: u64,

    /// Oracle observation fixed at resolution.
    pub resolved_price: Option<u64>,

    /// Symbol pair the batch settles against.
    pub pair: String,

    /// Latched true by a successful resolution.
    pub resolved: bool,
}

impl Batch {
    /// Predictions are accepted in `[opens_at, closes_at)`.
    pub fn is_open(&self, now: u64) -> bool {
        now >= self.opens_at && now < self.closes_at
    }

    pub(crate) fn record_payment(&mut self, amount: u64) {
        self.gross_pool += amount;
    }

    pub(crate) fn mark_resolved(
        &mut self,
        price: u64,
        prize_pool: u64,
    ) -> Result<(), SettlementError> {
        if self.resolved {
            return Err(SettlementError::AlreadyResolved(self.id));
        }
        self.resolved_price = Some(price);
        self.prize_pool = prize_pool;
        self.resolved = true;
        Ok(())
    }
}

/// Owns all batch records. Ids are dense and sequential from 1, so the
/// backing store is a plain vector indexed by `id - 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchLedger {
    batches: Vec<Batch>,
}

impl BatchLedger {
    pub fn create(
        &mut self,
        ticket_cost: u64,
        starts_in: u64,
        lasts_for: u64,
        pair: &str,
        now: u64,
    ) -> Result<u64, SettlementError> {
        if ticket_cost == 0 {
            return Err(SettlementError::InvalidTicketCost);
        }
        if lasts_for == 0 {
            return Err(SettlementError::InvalidDuration);
        }

        let id = self.batches.len() as u64 + 1;
        let opens_at = now + starts_in;
        self.batches.push(Batch {
            id,
            ticket_cost,
            entry_count: 0,
            gross_pool: 0,
            prize_pool: 0,
            opens_at,
            closes_at: opens_at + lasts_for,
            resolved_price: None,
            pair: pair.to_string(),
            resolved: false,
        });
        Ok(id)
    }

    pub fn get(&self, id: u64) -> Result<&Batch, SettlementError> {
        if id == 0 {
            return Err(SettlementError::InvalidId(id));
        }
        self.batches
            .get(id as usize - 1)
            .ok_or(SettlementError::InvalidId(id))
    }

    pub(crate) fn get_mut(&mut self, id: u64) -> Result<&mut Batch, SettlementError> {
        if id == 0 {
            return Err(SettlementError::InvalidId(id));
        }
        self.batches
            .get_mut(id as usize - 1)
            .ok_or(SettlementError::InvalidId(id))
    }

    pub fn count(&self) -> u64 {
        self.batches.len() as u64
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids() {
        let mut ledger = BatchLedger::default();

        let first = ledger.create(100, 0, 3600, "btc_usdt", 1_000).unwrap();
        let second = ledger.create(200, 60, 3600, "eth_usdt", 1_000).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ledger.count(), 2);

        let batch = ledger.get(2).unwrap();
        assert_eq!(batch.opens_at, 1_060);
        assert_eq!(batch.closes_at, 4_660);
        assert_eq!(batch.entry_count, 0);
        assert_eq!(batch.gross_pool, 0);
        assert!(!batch.resolved);
    }

    #[test]
    fn test_invalid_ids() {
        let mut ledger = BatchLedger::default();
        ledger.create(100, 0, 3600, "btc_usdt", 1_000).unwrap();

        assert_eq!(ledger.get(0), Err(SettlementError::InvalidId(0)));
        assert_eq!(ledger.get(2), Err(SettlementError::InvalidId(2)));
        assert!(ledger.get(1).is_ok());
    }

    #[test]
    fn test_creation_guards() {
        let mut ledger = BatchLedger::default();

        assert_eq!(
            ledger.create(0, 0, 3600, "btc_usdt", 1_000),
            Err(SettlementError::InvalidTicketCost)
        );
        assert_eq!(
            ledger.create(100, 0, 0, "btc_usdt", 1_000),
            Err(SettlementError::InvalidDuration)
        );
        assert_eq!(ledger.count(), 0);
    }

    #[test]
    fn test_open_window_is_half_open() {
        let mut ledger = BatchLedger::default();
        ledger.create(100, 10, 20, "btc_usdt", 1_000).unwrap();
        let batch = ledger.get(1).unwrap();

        assert!(!batch.is_open(1_009));
        assert!(batch.is_open(1_010));
        assert!(batch.is_open(1_029));
        assert!(!batch.is_open(1_030));
    }

    #[test]
    fn test_mark_resolved_latches() {
        let mut ledger = BatchLedger::default();
        ledger.create(100, 0, 3600, "btc_usdt", 1_000).unwrap();

        let batch = ledger.get_mut(1).unwrap();
        batch.mark_resolved(4_242, 950).unwrap();
        assert_eq!(batch.resolved_price, Some(4_242));
        assert_eq!(batch.prize_pool, 950);
        assert!(batch.resolved);

        assert_eq!(
            batch.mark_resolved(5_000, 0),
            Err(SettlementError::AlreadyResolved(1))
        );
        assert_eq!(batch.resolved_price, Some(4_242));
    }
}
