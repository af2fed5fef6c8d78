// Application state management

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::bank::{Bank, Transaction};
use crate::oracle::PriceRouter;
use crate::settlement::{ResolveOutcome, SettlementEngine, SettlementError};

pub type SharedState = Arc<Mutex<AppState>>;

/// Failures surfaced by the service layer: everything the engine rejects,
/// plus payments the bank cannot cover. The latter is refused before the
/// engine is invoked, so a rejected call never leaves partial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Settlement(SettlementError),
    InsufficientBalance { available: u64, required: u64 },
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        AppError::Settlement(err)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Settlement(err) => write!(f, "{}", err),
            AppError::InsufficientBalance {
                available,
                required,
            } => {
                write!(
                    f,
                    "Insufficient balance: have {}, need {}",
                    available, required
                )
            }
        }
    }
}

impl std::error::Error for AppError {}

/// Construction-time engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub admin: String,
    pub fee_rate_parts: u64,
    pub initial_pairs: Vec<String>,
    pub state_path: String,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let admin = std::env::var("PREDEFI_ADMIN").unwrap_or_else(|_| "admin".to_string());
        let fee_rate_parts = std::env::var("PREDEFI_FEE_PARTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2_000);
        let initial_pairs = std::env::var("PREDEFI_PAIRS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "eth_usdt".to_string(),
                    "btc_usdt".to_string(),
                    "bat_usdt".to_string(),
                ]
            });
        let state_path =
            std::env::var("PREDEFI_STATE_PATH").unwrap_or_else(|_| "data/state.json".to_string());

        Self {
            admin,
            fee_rate_parts,
            initial_pairs,
            state_path,
        }
    }
}

#[derive(Serialize)]
struct PersistedState<'a> {
    engine: &'a SettlementEngine,
    bank: &'a Bank,
}

#[derive(Deserialize)]
struct RestoredState {
    engine: SettlementEngine,
    bank: Bank,
}

pub struct AppState {
    pub engine: SettlementEngine,
    pub bank: Bank,
    pub router: PriceRouter,
    pub activity: Vec<String>,
    clock_offset: u64,
    state_path: String,
}

impl AppState {
    pub fn new() -> Self {
        println!("🔮 Initializing PreDeFi Settlement Ledger...");
        let state = Self::with_config(EngineConfig::from_env(), PriceRouter::from_env());
        println!(
            "✅ Engine ready | admin: {} | fee: {} parts | {} pair(s) whitelisted",
            state.engine.admin(),
            state.engine.fee(),
            state.engine.pairs().count()
        );
        state
    }

    pub fn with_config(config: EngineConfig, router: PriceRouter) -> Self {
        let mut state = Self {
            engine: SettlementEngine::new(
                &config.admin,
                config.fee_rate_parts,
                config.initial_pairs,
            ),
            bank: Bank::default(),
            router,
            activity: Vec::new(),
            clock_offset: 0,
            state_path: config.state_path,
        };

        match state.load_from_disk() {
            Ok(()) => tracing::info!(path = %state.state_path, "restored persisted state"),
            Err(_) => tracing::info!("no persisted state found, starting fresh"),
        }
        state
    }

    /// Current engine time: wall clock plus any test-advanced offset.
    pub fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + self.clock_offset
    }

    /// Dev facility mirroring the usual test-harness time travel. The
    /// offset only grows; engine time never runs backwards.
    pub fn advance_time(&mut self, seconds: u64) -> u64 {
        self.clock_offset += seconds;
        self.now()
    }

    // ===== OPERATIONS =====
    //
    // Each operation runs engine checks first, then moves value through the
    // bank, then records a transaction. Callers hold the state lock for the
    // whole call, so every operation is atomic with respect to the others.

    pub fn deposit(&mut self, account: &str, amount: u64) -> u64 {
        let now = self.now();
        let new_balance = self.bank.deposit(account, amount, now);
        self.log_activity("📥", "DEPOSIT", &format!("{} received {}", account, amount));
        new_balance
    }

    pub fn execute_whitelist(
        &mut self,
        caller: &str,
        pairs: &[String],
    ) -> Result<Transaction, AppError> {
        self.engine.whitelist(caller, pairs)?;
        let now = self.now();
        let tx = self
            .bank
            .record(Transaction::whitelist(caller, pairs.len(), now));
        self.log_activity(
            "📃",
            "WHITELIST",
            &format!("{} whitelisted {} pair(s)", caller, pairs.len()),
        );
        Ok(tx)
    }

    pub fn execute_new_prediction(
        &mut self,
        caller: &str,
        ticket_cost: u64,
        starts_in: u64,
        lasts_for: u64,
        pair: &str,
    ) -> Result<(u64, Transaction), AppError> {
        let now = self.now();
        let batch_id =
            self.engine
                .new_prediction(caller, ticket_cost, starts_in, lasts_for, pair, now)?;
        let tx = self
            .bank
            .record(Transaction::batch_created(batch_id, pair, ticket_cost, now));
        self.log_activity(
            "📊",
            "BATCH_CREATED",
            &format!("Batch {} on {} at {} per ticket", batch_id, pair, ticket_cost),
        );
        Ok((batch_id, tx))
    }

    pub fn execute_predict(
        &mut self,
        caller: &str,
        batch_id: u64,
        guesses: &[u64],
        payment: u64,
    ) -> Result<Transaction, AppError> {
        let now = self.now();
        let available = self.bank.balance(caller);
        if available < payment {
            return Err(AppError::InsufficientBalance {
                available,
                required: payment,
            });
        }

        self.engine.predict(caller, batch_id, guesses, payment, now)?;
        self.bank.debit(caller, payment).unwrap();

        let tx = self
            .bank
            .record(Transaction::prediction(caller, batch_id, payment, now));
        self.log_activity(
            "🎯",
            "PREDICTION",
            &format!(
                "{} staked {} on {} guess(es) in batch {}",
                caller,
                payment,
                guesses.len(),
                batch_id
            ),
        );
        Ok(tx)
    }

    pub fn execute_resolve(
        &mut self,
        caller: &str,
        batch_id: u64,
    ) -> Result<ResolveOutcome, AppError> {
        let now = self.now();
        let outcome = self.engine.resolve(caller, batch_id, now, &self.router)?;

        self.bank
            .record(Transaction::batch_resolved(batch_id, outcome.price_now, now));
        self.log_activity(
            "✅",
            "BATCH_RESOLVED",
            &format!(
                "Batch {} settled at {} | {} winning slot(s) | fee {}",
                batch_id,
                outcome.price_now,
                outcome.winners.len(),
                outcome.fee_amount
            ),
        );
        Ok(outcome)
    }

    pub fn execute_withdraw_win(
        &mut self,
        caller: &str,
        batch_id: u64,
    ) -> Result<(u64, Transaction), AppError> {
        let amount = self.engine.withdraw_win(caller, batch_id)?;
        let now = self.now();
        self.bank.credit(caller, amount);
        let tx = self
            .bank
            .record(Transaction::payout(caller, batch_id, amount, now));
        self.log_activity(
            "🏆",
            "WIN_CLAIMED",
            &format!("{} claimed {} from batch {}", caller, amount, batch_id),
        );
        Ok((amount, tx))
    }

    pub fn execute_collect_fee(
        &mut self,
        caller: &str,
        destination: &str,
    ) -> Result<(u64, Transaction), AppError> {
        let amount = self.engine.collect_fee(caller)?;
        let now = self.now();
        self.bank.credit(destination, amount);
        let tx = self
            .bank
            .record(Transaction::fee_collect(destination, amount, now));
        self.log_activity(
            "💰",
            "FEE_COLLECTED",
            &format!("{} swept {} to {}", caller, amount, destination),
        );
        Ok((amount, tx))
    }

    // ===== ACTIVITY FEED =====

    pub fn log_activity(&mut self, emoji: &str, action: &str, details: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let entry = format!("[{}] {} {} | {}", timestamp, emoji, action, details);
        println!("{}", entry);
        self.activity.push(entry);
        if self.activity.len() > 1_000 {
            self.activity.remove(0);
        }
    }

    // ===== PERSISTENCE =====

    pub fn save_to_disk(&self) -> Result<(), String> {
        let snapshot = PersistedState {
            engine: &self.engine,
            bank: &self.bank,
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        if let Some(parent) = std::path::Path::new(&self.state_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create state directory: {}", e))?;
            }
        }
        std::fs::write(&self.state_path, json)
            .map_err(|e| format!("Failed to write state file: {}", e))?;
        Ok(())
    }

    fn load_from_disk(&mut self) -> Result<(), String> {
        let json = std::fs::read_to_string(&self.state_path).map_err(|_| "No state file found")?;
        let restored: RestoredState = serde_json::from_str(&json)
            .map_err(|e| format!("Failed to deserialize state: {}", e))?;

        self.engine = restored.engine;
        self.bank = restored.bank;
        Ok(())
    }

    /// Hex digest of the serialized snapshot. Deterministic because every
    /// map in the snapshot is ordered.
    pub fn state_digest(&self) -> String {
        let snapshot = PersistedState {
            engine: &self.engine,
            bank: &self.bank,
        };
        let bytes = serde_json::to_vec(&snapshot).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(fee: u64, pairs: Vec<String>) -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            admin: "admin".to_string(),
            fee_rate_parts: fee,
            initial_pairs: pairs,
            state_path: dir
                .path()
                .join("state.json")
                .to_string_lossy()
                .into_owned(),
        };
        AppState::with_config(config, PriceRouter::new("http://localhost:8545", true))
    }

    #[test]
    fn test_predict_requires_funds() {
        let mut state = test_state(5_000, vec!["eth_usdt".to_string()]);
        state
            .execute_new_prediction("admin", 100, 0, 1_000, "eth_usdt")
            .unwrap();

        let err = state
            .execute_predict("alice", 1, &[4_000], 100)
            .unwrap_err();
        assert_eq!(
            err,
            AppError::InsufficientBalance {
                available: 0,
                required: 100
            }
        );

        // The rejected call left the engine untouched.
        assert_eq!(state.engine.batch(1).unwrap().entry_count, 0);

        state.deposit("alice", 1_000);
        state.execute_predict("alice", 1, &[4_000], 100).unwrap();
        assert_eq!(state.bank.balance("alice"), 900);
        assert_eq!(state.engine.batch(1).unwrap().gross_pool, 100);
    }

    #[test]
    fn test_engine_rejection_leaves_balance_untouched() {
        let mut state = test_state(5_000, vec!["eth_usdt".to_string()]);
        state
            .execute_new_prediction("admin", 100, 0, 1_000, "eth_usdt")
            .unwrap();
        state.deposit("alice", 1_000);

        let err = state
            .execute_predict("alice", 1, &[4_000], 150)
            .unwrap_err();
        assert_eq!(
            err,
            AppError::Settlement(SettlementError::WrongPaymentValue {
                expected: 100,
                got: 150
            })
        );
        assert_eq!(state.bank.balance("alice"), 1_000);
    }

    #[test]
    fn test_advance_time_only_grows() {
        let mut state = test_state(5_000, vec!["eth_usdt".to_string()]);
        let before = state.now();
        let advanced = state.advance_time(86_400);
        assert!(advanced >= before + 86_400);
    }
}
