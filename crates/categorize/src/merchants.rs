use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use cardwise_core::{Category, CategoryMethod, CategoryResult, Transaction};

use crate::rules::RuleError;

/// Confidence assigned to a curated merchant lookup hit.
const LOOKUP_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Deserialize)]
struct MerchantTable {
    merchants: HashMap<String, String>,
}

/// Static merchant → category table, consulted after the rule tier.
pub struct MerchantDb {
    entries: HashMap<String, Category>,
}

impl MerchantDb {
    pub fn with_defaults() -> Self {
        Self::from_toml(include_str!("default_merchants.toml"))
            .expect("embedded merchant table must parse")
    }

    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let table: MerchantTable = toml::from_str(content)?;
        let mut entries = HashMap::with_capacity(table.merchants.len());
        for (merchant, category) in table.merchants {
            let category = Category::from_str(&category)
                .map_err(|_| RuleError::UnknownCategory(category.clone()))?;
            entries.insert(merchant.to_lowercase(), category);
        }
        Ok(MerchantDb { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact match on the derived merchant name, then containment either way.
    pub fn lookup(&self, tx: &Transaction) -> Option<CategoryResult> {
        let merchant = tx.merchant.to_lowercase();
        if merchant.is_empty() {
            return None;
        }

        if let Some(category) = self.entries.get(&merchant) {
            return Some(hit(*category, &merchant));
        }
        self.entries
            .iter()
            .find(|(name, _)| merchant.contains(name.as_str()))
            .map(|(name, category)| hit(*category, name))
    }
}

fn hit(category: Category, merchant: &str) -> CategoryResult {
    CategoryResult::new(category, LOOKUP_CONFIDENCE, CategoryMethod::MerchantDb)
        .with_details(format!("merchant '{merchant}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardwise_core::Money;
    use chrono::NaiveDate;

    fn tx(merchant: &str) -> Transaction {
        let mut tx = Transaction::new(
            NaiveDate::from_ymd_opt(2025, 8, 10).unwrap(),
            merchant.to_string(),
            Money::from_rupees(100),
        );
        tx.merchant = merchant.to_string();
        tx
    }

    #[test]
    fn exact_lookup() {
        let db = MerchantDb::with_defaults();
        let r = db.lookup(&tx("zomato")).unwrap();
        assert_eq!(r.category, Category::Food);
        assert_eq!(r.method, CategoryMethod::MerchantDb);
        assert_eq!(r.confidence, 0.9);
    }

    #[test]
    fn containment_lookup() {
        let db = MerchantDb::with_defaults();
        let r = db.lookup(&tx("Zomato Order")).unwrap();
        assert_eq!(r.category, Category::Food);
    }

    #[test]
    fn unknown_merchant_is_none() {
        let db = MerchantDb::with_defaults();
        assert!(db.lookup(&tx("Unknown Local Vendor")).is_none());
    }

    #[test]
    fn empty_merchant_is_none() {
        let db = MerchantDb::with_defaults();
        assert!(db.lookup(&tx("")).is_none());
    }

    #[test]
    fn from_toml_rejects_unknown_category() {
        let bad = "[merchants]\nzomato = \"snacks\"\n";
        assert!(MerchantDb::from_toml(bad).is_err());
    }

    #[test]
    fn defaults_are_nonempty() {
        assert!(!MerchantDb::with_defaults().is_empty());
    }
}
