use serde::{Deserialize, Serialize};

use super::batches::Batch;
use super::predictions::Entry;

/// Number of winning slots paid out per batch.
pub const WINNER_SLOTS: usize = 3;

/// Fee rates are expressed in parts per 100 000 of a batch's gross intake.
pub const FEE_DENOMINATOR: u64 = 100_000;

/// One winning slot in rank order. The same account may hold several slots
/// when more than one of its guesses lands among the closest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningSlot {
    /// 1-based position in the ranked winner list.
    pub rank: u64,
    pub account: String,
    pub guess: u64,
    pub distance: u64,
    pub payout: u64,
}

/// Per-account outcome of a settled batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub is_winner: bool,
    /// 1-based rank of the account's earliest winning slot; 0 when not a
    /// winner.
    pub rank: u64,
    /// Total share across every slot the account occupies.
    pub payout: u64,
}

impl ResultRecord {
    pub fn losing() -> Self {
        Self {
            is_winner: false,
            rank: 0,
            payout: 0,
        }
    }
}

/// Externally observable record of one resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub admin: String,
    pub batch_id: u64,
    pub price_now: u64,
    pub price_ref: u64,
    /// Slot accounts in rank order; duplicates allowed.
    pub winners: Vec<String>,
    pub resolved_at: u64,
}

/// What a successful `resolve` returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub batch_id: u64,
    pub price_now: u64,
    pub price_ref: u64,
    pub winners: Vec<String>,
    pub fee_amount: u64,
    pub prize_pool: u64,
    pub slots: Vec<WinningSlot>,
}

/// Everything one resolution decides, before it is written back.
#[derive(Debug, Clone)]
pub(crate) struct Settlement {
    pub slots: Vec<WinningSlot>,
    pub results: Vec<(String, ResultRecord)>,
    pub fee_amount: u64,
    pub prize_pool: u64,
}

struct Candidate<'a> {
    account: &'a str,
    guess: u64,
    distance: u64,
    submission_order: u64,
}

/// Rank all guesses of a batch against the observed price and split the
/// pool.
///
/// Candidates are ordered by the strict total order
/// `(distance, submission_order)`; the stable sort keeps guesses from one
/// entry in their submitted order when both keys tie. The prize pool is
/// the gross intake minus the fee, split equally across the winning slots
/// with the integer-division remainder credited to the first slot, so slot
/// payouts always sum to the prize pool exactly.
pub(crate) fn settle(
    batch: &Batch,
    entries: &[&Entry],
    price_now: u64,
    fee_rate_parts: u64,
) -> Settlement {
    let mut candidates: Vec<Candidate> = Vec::new();
    for entry in entries {
        for &guess in &entry.guesses {
            candidates.push(Candidate {
                account: &entry.account,
                guess,
                distance: guess.abs_diff(price_now),
                submission_order: entry.submission_order,
            });
        }
    }
    candidates.sort_by_key(|c| (c.distance, c.submission_order));
    candidates.truncate(WINNER_SLOTS);

    let fee_amount =
        (batch.gross_pool as u128 * fee_rate_parts as u128 / FEE_DENOMINATOR as u128) as u64;
    let prize_pool = batch.gross_pool - fee_amount;

    let mut slots = Vec::with_capacity(candidates.len());
    if !candidates.is_empty() {
        let share = prize_pool / candidates.len() as u64;
        let remainder = prize_pool - share * candidates.len() as u64;
        for (i, candidate) in candidates.iter().enumerate() {
            let payout = if i == 0 { share + remainder } else { share };
            slots.push(WinningSlot {
                rank: i as u64 + 1,
                account: candidate.account.to_string(),
                guess: candidate.guess,
                distance: candidate.distance,
                payout,
            });
        }
    }

    let mut results: Vec<(String, ResultRecord)> = Vec::new();
    for slot in &slots {
        match results.iter_mut().find(|(account, _)| *account == slot.account) {
            Some((_, record)) => record.payout += slot.payout,
            None => results.push((
                slot.account.clone(),
                ResultRecord {
                    is_winner: true,
                    rank: slot.rank,
                    payout: slot.payout,
                },
            )),
        }
    }

    Settlement {
        slots,
        results,
        fee_amount,
        prize_pool,
    }
}
