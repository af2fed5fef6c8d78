// ============================================================================
// Settlement Module - Market Lifecycle & Ledger Semantics
// ============================================================================
//
// Core of the prediction settlement engine:
//   - pairs: whitelist of tradable symbol pairs
//   - batches: batch (market) records and pool accounting
//   - predictions: append-only guess entries
//   - resolution: ranking, fee and payout computation
//   - escrow: fee balance, settled results, one-shot claims
//
// ============================================================================

pub mod batches;
pub mod error;
pub mod escrow;
pub mod pairs;
pub mod predictions;
pub mod resolution;

pub use batches::{Batch, BatchLedger};
pub use error::SettlementError;
pub use escrow::EscrowLedger;
pub use pairs::PairRegistry;
pub use predictions::{Entry, PredictionBook};
pub use resolution::{
    ResolutionRecord, ResolveOutcome, ResultRecord, WinningSlot, FEE_DENOMINATOR, WINNER_SLOTS,
};

use serde::{Deserialize, Serialize};

use crate::oracle::PriceSource;

/// Single-admin authorization gate for restricted operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGate {
    admin: String,
}

impl AccessGate {
    pub fn new(admin: &str) -> Self {
        Self {
            admin: admin.to_string(),
        }
    }

    pub fn is_admin(&self, caller: &str) -> bool {
        caller == self.admin
    }

    pub fn admin(&self) -> &str {
        &self.admin
    }

    fn require(&self, caller: &str) -> Result<(), SettlementError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(SettlementError::Unauthorized)
        }
    }
}

/// The settlement engine: one owned state struct with no hidden statics.
///
/// Every operation takes the caller identity explicitly, and the current
/// time explicitly wherever a time window applies. Nothing here suspends
/// or retries; callers hold a single lock around each call, which gives
/// the one total order over operations the ledger semantics assume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementEngine {
    gate: AccessGate,
    fee_rate_parts: u64,
    pairs: PairRegistry,
    batches: BatchLedger,
    book: PredictionBook,
    escrow: EscrowLedger,
    resolutions: Vec<ResolutionRecord>,
}

impl SettlementEngine {
    pub fn new(admin: &str, fee_rate_parts: u64, initial_pairs: Vec<String>) -> Self {
        Self {
            gate: AccessGate::new(admin),
            fee_rate_parts,
            pairs: PairRegistry::new(initial_pairs),
            batches: BatchLedger::default(),
            book: PredictionBook::default(),
            escrow: EscrowLedger::default(),
            resolutions: Vec::new(),
        }
    }

    // ===== READ SURFACE =====

    pub fn admin(&self) -> &str {
        self.gate.admin()
    }

    /// Fee rate in parts per 100 000 of a resolved batch's gross intake.
    pub fn fee(&self) -> u64 {
        self.fee_rate_parts
    }

    /// Fee balance pending admin withdrawal.
    pub fn available(&self) -> u64 {
        self.escrow.available()
    }

    pub fn is_valid_pair(&self, pair: &str) -> bool {
        self.pairs.is_whitelisted(pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &String> {
        self.pairs.all()
    }

    pub fn batch(&self, id: u64) -> Result<&Batch, SettlementError> {
        self.batches.get(id)
    }

    pub fn batch_count(&self) -> u64 {
        self.batches.count()
    }

    pub fn iter_batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    pub fn result(&self, account: &str, id: u64) -> ResultRecord {
        self.escrow.result(account, id)
    }

    pub fn claimed(&self, account: &str, id: u64) -> bool {
        self.escrow.claimed(account, id)
    }

    pub fn resolutions(&self) -> &[ResolutionRecord] {
        &self.resolutions
    }

    // ===== WRITE SURFACE =====

    /// Admin-only: whitelist additional pairs. Idempotent.
    pub fn whitelist(&mut self, caller: &str, pairs: &[String]) -> Result<(), SettlementError> {
        self.gate.require(caller)?;
        self.pairs.add_pairs(pairs);
        Ok(())
    }

    /// Admin-only: open a new batch on a whitelisted pair.
    pub fn new_prediction(
        &mut self,
        caller: &str,
        ticket_cost: u64,
        starts_in: u64,
        lasts_for: u64,
        pair: &str,
        now: u64,
    ) -> Result<u64, SettlementError> {
        self.gate.require(caller)?;
        if !self.pairs.is_whitelisted(pair) {
            return Err(SettlementError::InvalidPair(pair.to_string()));
        }
        self.batches.create(ticket_cost, starts_in, lasts_for, pair, now)
    }

    /// Submit a paid guess entry into an open batch.
    pub fn predict(
        &mut self,
        caller: &str,
        id: u64,
        guesses: &[u64],
        payment: u64,
        now: u64,
    ) -> Result<(), SettlementError> {
        let batch = self.batches.get_mut(id)?;
        self.book.submit(batch, caller, guesses, payment, now)
    }

    /// Admin-only: settle a batch whose deadline has passed.
    ///
    /// Observes the batch's pair once, ranks every guess, accrues the fee,
    /// posts per-account results and appends a resolution record. The batch
    /// is latched resolved; a second call always fails.
    pub fn resolve(
        &mut self,
        caller: &str,
        id: u64,
        now: u64,
        feed: &dyn PriceSource,
    ) -> Result<ResolveOutcome, SettlementError> {
        self.gate.require(caller)?;
        let batch = self.batches.get(id)?;
        if now < batch.closes_at {
            return Err(SettlementError::NotYet(id));
        }
        if batch.resolved {
            return Err(SettlementError::AlreadyResolved(id));
        }

        let observation = feed.observe(&batch.pair)?;
        let entries: Vec<&Entry> = self.book.entries_for(id).collect();
        let settlement = resolution::settle(batch, &entries, observation.price_now, self.fee_rate_parts);

        let winners: Vec<String> = settlement.slots.iter().map(|s| s.account.clone()).collect();
        self.escrow.accrue_fee(settlement.fee_amount);
        self.escrow.post_results(id, settlement.results);
        self.resolutions.push(ResolutionRecord {
            admin: caller.to_string(),
            batch_id: id,
            price_now: observation.price_now,
            price_ref: observation.price_ref,
            winners: winners.clone(),
            resolved_at: now,
        });

        self.batches
            .get_mut(id)?
            .mark_resolved(observation.price_now, settlement.prize_pool)?;

        Ok(ResolveOutcome {
            batch_id: id,
            price_now: observation.price_now,
            price_ref: observation.price_ref,
            winners,
            fee_amount: settlement.fee_amount,
            prize_pool: settlement.prize_pool,
            slots: settlement.slots,
        })
    }

    /// One-time claim of the caller's own winnings. Returns the payout the
    /// surrounding environment must credit to the caller.
    pub fn withdraw_win(&mut self, caller: &str, id: u64) -> Result<u64, SettlementError> {
        self.escrow.withdraw_win(id, caller)
    }

    /// Admin-only: sweep the whole accrued fee balance. Returns the amount
    /// the surrounding environment must credit to the chosen destination.
    pub fn collect_fee(&mut self, caller: &str) -> Result<u64, SettlementError> {
        self.gate.require(caller)?;
        self.escrow.collect_fee()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{PriceObservation, PriceSource};

    struct FixedFeed {
        price_now: u64,
        price_ref: u64,
    }

    impl PriceSource for FixedFeed {
        fn observe(&self, _pair: &str) -> Result<PriceObservation, SettlementError> {
            Ok(PriceObservation {
                price_now: self.price_now,
                price_ref: self.price_ref,
            })
        }

        fn router_address(&self) -> &str {
            "fixed"
        }
    }

    fn engine() -> SettlementEngine {
        SettlementEngine::new("admin", 5_000, vec!["eth_usdt".to_string()])
    }

    #[test]
    fn test_admin_gates() {
        let mut engine = engine();
        let feed = FixedFeed {
            price_now: 100,
            price_ref: 90,
        };

        assert_eq!(
            engine.whitelist("mallory", &["btc_usdt".to_string()]),
            Err(SettlementError::Unauthorized)
        );
        assert_eq!(
            engine.new_prediction("mallory", 100, 0, 100, "eth_usdt", 0),
            Err(SettlementError::Unauthorized)
        );
        assert_eq!(
            engine.resolve("mallory", 1, 1_000, &feed),
            Err(SettlementError::Unauthorized)
        );
        assert_eq!(
            engine.collect_fee("mallory"),
            Err(SettlementError::Unauthorized)
        );
    }

    #[test]
    fn test_new_prediction_requires_whitelisted_pair() {
        let mut engine = engine();

        assert_eq!(
            engine.new_prediction("admin", 100, 0, 100, "celo_usdt", 0),
            Err(SettlementError::InvalidPair("celo_usdt".to_string()))
        );

        engine
            .whitelist("admin", &["celo_usdt".to_string()])
            .unwrap();
        assert_eq!(
            engine.new_prediction("admin", 100, 0, 100, "celo_usdt", 0),
            Ok(1)
        );
    }

    #[test]
    fn test_resolve_lifecycle() {
        let mut engine = engine();
        let feed = FixedFeed {
            price_now: 4_242,
            price_ref: 4_200,
        };

        let id = engine
            .new_prediction("admin", 1_000, 0, 100, "eth_usdt", 0)
            .unwrap();
        engine.predict("alice", id, &[4_000], 1_000, 10).unwrap();
        engine.predict("bob", id, &[4_240], 1_000, 20).unwrap();

        assert_eq!(
            engine.resolve("admin", id, 99, &feed),
            Err(SettlementError::NotYet(id))
        );

        let outcome = engine.resolve("admin", id, 100, &feed).unwrap();
        assert_eq!(outcome.winners, vec!["bob".to_string(), "alice".to_string()]);
        assert_eq!(outcome.fee_amount, 100);
        assert_eq!(outcome.prize_pool, 1_900);

        let batch = engine.batch(id).unwrap();
        assert!(batch.resolved);
        assert_eq!(batch.resolved_price, Some(4_242));
        assert_eq!(batch.gross_pool, 2_000);
        assert_eq!(batch.prize_pool, 1_900);

        assert_eq!(
            engine.resolve("admin", id, 200, &feed),
            Err(SettlementError::AlreadyResolved(id))
        );

        // Predictions are refused once the window has closed, resolved or not.
        assert_eq!(
            engine.predict("carol", id, &[4_242], 1_000, 200),
            Err(SettlementError::MarketNotOpen(id))
        );

        let record = &engine.resolutions()[0];
        assert_eq!(record.admin, "admin");
        assert_eq!(record.price_ref, 4_200);
        assert_eq!(record.winners.len(), 2);
    }

    #[test]
    fn test_claims_flow_through_engine() {
        let mut engine = engine();
        let feed = FixedFeed {
            price_now: 500,
            price_ref: 500,
        };

        let id = engine
            .new_prediction("admin", 100, 0, 100, "eth_usdt", 0)
            .unwrap();
        engine.predict("alice", id, &[500], 100, 10).unwrap();
        engine.resolve("admin", id, 100, &feed).unwrap();

        assert_eq!(
            engine.withdraw_win("bob", id),
            Err(SettlementError::NotWinner)
        );
        assert_eq!(engine.withdraw_win("alice", id), Ok(95));
        assert_eq!(
            engine.withdraw_win("alice", id),
            Err(SettlementError::AlreadyClaimed)
        );
        assert!(engine.claimed("alice", id));

        assert_eq!(engine.collect_fee("admin"), Ok(5));
        assert_eq!(
            engine.collect_fee("admin"),
            Err(SettlementError::NothingToWithdraw)
        );
    }

    #[test]
    fn test_missing_price_leaves_batch_unresolved() {
        struct EmptyFeed;
        impl PriceSource for EmptyFeed {
            fn observe(&self, pair: &str) -> Result<PriceObservation, SettlementError> {
                Err(SettlementError::PriceUnavailable(pair.to_string()))
            }
            fn router_address(&self) -> &str {
                "empty"
            }
        }

        let mut engine = engine();
        let id = engine
            .new_prediction("admin", 100, 0, 100, "eth_usdt", 0)
            .unwrap();

        assert_eq!(
            engine.resolve("admin", id, 100, &EmptyFeed),
            Err(SettlementError::PriceUnavailable("eth_usdt".to_string()))
        );
        assert!(!engine.batch(id).unwrap().resolved);
        assert_eq!(engine.available(), 0);
        assert!(engine.resolutions().is_empty());
    }
}
