//! Fixed-answer `AssetClassifier` test double, for tests that need a
//! symbol classified a specific way regardless of the heuristic.

use std::collections::HashMap;
use std::sync::Mutex;
use wyckoff_core::asset::AssetClass;
use wyckoff_core::collaborators::AssetClassifier;

#[derive(Default)]
pub struct FixedAssetClassifier {
    overrides: Mutex<HashMap<String, AssetClass>>,
    default: AssetClass,
}

impl FixedAssetClassifier {
    pub fn new(default: AssetClass) -> Self {
        Self { overrides: Mutex::new(HashMap::new()), default }
    }

    pub fn set(&self, symbol: &str, class: AssetClass) {
        self.overrides.lock().expect("fixed classifier lock poisoned").insert(symbol.to_string(), class);
    }
}

impl AssetClassifier for FixedAssetClassifier {
    fn classify(&self, symbol: &str) -> AssetClass {
        self.overrides.lock().expect("fixed classifier lock poisoned").get(symbol).copied().unwrap_or(self.default)
    }
}
