/// PreDeFi Settlement Ledger
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod bank;
pub mod handlers;
pub mod models;
pub mod oracle;
pub mod settlement;

pub use app_state::{AppError, AppState, EngineConfig, SharedState};
pub use bank::{Bank, BankStats, Transaction, TxType};
pub use oracle::{PriceObservation, PriceRouter, PriceSource};
pub use settlement::{
    AccessGate, Batch, BatchLedger, Entry, EscrowLedger, PairRegistry, PredictionBook,
    ResolutionRecord, ResolveOutcome, ResultRecord, SettlementEngine, SettlementError,
    WinningSlot, FEE_DENOMINATOR, WINNER_SLOTS,
};
