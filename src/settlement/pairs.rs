use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whitelist of tradable symbol pairs.
///
/// Pairs can only be added, never removed; inserts are idempotent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairRegistry {
    pairs: BTreeSet<String>,
}

impl PairRegistry {
    pub fn new(initial: Vec<String>) -> Self {
        Self {
            pairs: initial.into_iter().collect(),
        }
    }

    pub fn add_pairs(&mut self, pairs: &[String]) {
        for pair in pairs {
            self.pairs.insert(pair.clone());
        }
    }

    pub fn is_whitelisted(&self, pair: &str) -> bool {
        self.pairs.contains(pair)
    }

    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_lookup() {
        let registry = PairRegistry::new(vec!["btc_usdt".to_string()]);

        assert!(registry.is_whitelisted("btc_usdt"));
        assert!(!registry.is_whitelisted("eth_usdt"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = PairRegistry::new(vec!["btc_usdt".to_string()]);

        registry.add_pairs(&["eth_usdt".to_string(), "btc_usdt".to_string()]);
        registry.add_pairs(&["eth_usdt".to_string()]);

        assert_eq!(registry.all().count(), 2);
        assert!(registry.is_whitelisted("eth_usdt"));
    }
}
