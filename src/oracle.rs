// Price router client.
//
// The engine treats the router as an external collaborator: one observation
// per pair, two opaque values. `price_now` anchors the distance computation
// at resolution; `price_ref` is surfaced in resolution records but never
// compared against.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::settlement::SettlementError;

/// A two-value price observation for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price_now: u64,
    pub price_ref: u64,
}

/// Read-only price feed the resolution step consults.
pub trait PriceSource {
    fn observe(&self, pair: &str) -> Result<PriceObservation, SettlementError>;

    /// Identifies the configured remote router endpoint.
    fn router_address(&self) -> &str;
}

/// Client for the remote price router.
///
/// `observe` always reads the local observation table. In mock mode the
/// table is seeded by hand; otherwise `fetch_quote` pulls the latest quote
/// for a pair over HTTP and the caller stores it with `set_price`.
#[derive(Debug)]
pub struct PriceRouter {
    address: String,
    mock: bool,
    prices: HashMap<String, PriceObservation>,
}

impl PriceRouter {
    pub fn new(address: &str, mock: bool) -> Self {
        Self {
            address: address.to_string(),
            mock,
            prices: HashMap::new(),
        }
    }

    pub fn from_env() -> Self {
        let address =
            std::env::var("ROUTER_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
        let mock = std::env::var("ROUTER_MOCK_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);
        Self::new(&address, mock)
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Seed or overwrite the observation for a pair.
    pub fn set_price(&mut self, pair: &str, price_now: u64, price_ref: u64) {
        self.prices.insert(
            pair.to_string(),
            PriceObservation {
                price_now,
                price_ref,
            },
        );
    }

    /// Fetch the latest quote for a pair from a remote router.
    pub async fn fetch_quote(address: &str, pair: &str) -> Result<PriceObservation, String> {
        #[derive(Deserialize)]
        struct QuoteResponse {
            price_now: u64,
            price_ref: u64,
        }

        let url = format!("{}/quote/{}", address, pair);
        let resp = reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Router request failed: {}", e))?;

        let data: QuoteResponse = resp
            .json()
            .await
            .map_err(|e| format!("Failed to parse router response: {}", e))?;

        Ok(PriceObservation {
            price_now: data.price_now,
            price_ref: data.price_ref,
        })
    }
}

impl PriceSource for PriceRouter {
    fn observe(&self, pair: &str) -> Result<PriceObservation, SettlementError> {
        self.prices
            .get(pair)
            .copied()
            .ok_or_else(|| SettlementError::PriceUnavailable(pair.to_string()))
    }

    fn router_address(&self) -> &str {
        &self.address
    }
}
