//! Asset-class detection (spec.md §6). Drives which `ConfidenceScorer` the
//! pattern-detection stage selects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Stock,
    Forex,
}

/// Heuristic classifier: a 6-character alphabetic symbol (e.g. `EURUSD`) is
/// forex, everything else is a stock ticker.
pub fn classify_symbol(symbol: &str) -> AssetClass {
    if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        AssetClass::Forex
    } else {
        AssetClass::Stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_letter_alpha_is_forex() {
        assert_eq!(classify_symbol("EURUSD"), AssetClass::Forex);
        assert_eq!(classify_symbol("GBPJPY"), AssetClass::Forex);
    }

    #[test]
    fn anything_else_is_stock() {
        assert_eq!(classify_symbol("AAPL"), AssetClass::Stock);
        assert_eq!(classify_symbol("GOOGL"), AssetClass::Stock);
        assert_eq!(classify_symbol("BRK.B"), AssetClass::Stock);
        assert_eq!(classify_symbol("123456"), AssetClass::Stock);
    }
}
