// Request bodies for the HTTP surface.
//
// Caller identity is an explicit field on every write request; the service
// has no session layer, the surrounding tooling supplies it.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WhitelistRequest {
    pub caller: String,
    pub pairs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewPredictionRequest {
    pub caller: String,
    pub ticket_cost: u64,
    pub starts_in: u64,
    pub lasts_for: u64,
    pub pair: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub caller: String,
    pub guesses: Vec<u64>,
    pub payment: u64,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawWinRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct CollectFeeRequest {
    pub caller: String,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub account: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceTimeRequest {
    pub seconds: u64,
}
