// Settlement failure taxonomy.
//
// Every variant is a synchronous, non-retryable rejection of one call.
// A rejected call leaves no partial effects; the engine keeps serving.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementError {
    Unauthorized,
    InvalidPair(String),
    InvalidId(u64),
    MarketNotOpen(u64),
    NotYet(u64),
    AlreadyResolved(u64),
    WrongPaymentValue { expected: u64, got: u64 },
    NotWinner,
    AlreadyClaimed,
    NothingToWithdraw,
    InvalidTicketCost,
    InvalidDuration,
    EmptyGuesses,
    PriceUnavailable(String),
}

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementError::Unauthorized => write!(f, "Caller is not the admin"),
            SettlementError::InvalidPair(pair) => write!(f, "Pair not whitelisted: {}", pair),
            SettlementError::InvalidId(id) => write!(f, "No batch with id {}", id),
            SettlementError::MarketNotOpen(id) => {
                write!(f, "Batch {} is not open for predictions", id)
            }
            SettlementError::NotYet(id) => {
                write!(f, "Batch {} has not reached its deadline yet", id)
            }
            SettlementError::AlreadyResolved(id) => write!(f, "Batch {} is already resolved", id),
            SettlementError::WrongPaymentValue { expected, got } => {
                write!(f, "Wrong payment value: expected {}, got {}", expected, got)
            }
            SettlementError::NotWinner => write!(f, "Caller holds no winning slot in this batch"),
            SettlementError::AlreadyClaimed => write!(f, "Winnings already claimed"),
            SettlementError::NothingToWithdraw => write!(f, "No fee balance to withdraw"),
            SettlementError::InvalidTicketCost => write!(f, "Ticket cost must be positive"),
            SettlementError::InvalidDuration => write!(f, "Batch duration must be positive"),
            SettlementError::EmptyGuesses => write!(f, "At least one guess is required"),
            SettlementError::PriceUnavailable(pair) => {
                write!(f, "No price observation for {}", pair)
            }
        }
    }
}

impl std::error::Error for SettlementError {}
