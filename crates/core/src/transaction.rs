use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::category::Category;
use super::money::Money;

/// One spend line item extracted from a statement.
///
/// `amount` is always non-negative: statements are treated as card spend,
/// so the debit/credit sign is normalized away at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable hash of date + description + amount, for de-duplication and
    /// idempotent re-processing.
    pub id: String,
    pub date: NaiveDate,
    /// Raw merchant text as extracted from the statement.
    pub description: String,
    pub amount: Money,
    /// Shortened token set derived from `description`.
    pub merchant: String,
    #[serde(default = "default_category")]
    pub category: Category,
    /// True when another transaction in the same statement carries the same
    /// description and amount on a different date.
    #[serde(default)]
    pub is_recurring: bool,
}

fn default_category() -> Category {
    Category::Others
}

impl Transaction {
    pub fn new(date: NaiveDate, description: String, amount: Money) -> Self {
        let id = stable_id(date, &description, amount);
        Transaction {
            id,
            date,
            description,
            amount,
            merchant: String::new(),
            category: Category::Others,
            is_recurring: false,
        }
    }
}

/// SHA-256 over the identifying fields, hex-encoded.
pub fn stable_id(date: NaiveDate, description: &str, amount: Money) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    hasher.update(b"|");
    hasher.update(amount.to_paise().to_le_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// How a categorization decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMethod {
    Rule,
    MerchantDb,
    UserPattern,
    Classifier,
    Fallback,
}

impl std::fmt::Display for CategoryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryMethod::Rule => write!(f, "rule"),
            CategoryMethod::MerchantDb => write!(f, "merchant_db"),
            CategoryMethod::UserPattern => write!(f, "user_pattern"),
            CategoryMethod::Classifier => write!(f, "classifier"),
            CategoryMethod::Fallback => write!(f, "fallback"),
        }
    }
}

/// Output of categorization. Kept separate from `Transaction` so that
/// re-categorization never mutates parse output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResult {
    pub category: Category,
    /// 0.0 = guessed, 1.0 = certain.
    pub confidence: f32,
    pub method: CategoryMethod,
    pub details: Option<String>,
}

impl CategoryResult {
    pub fn new(category: Category, confidence: f32, method: CategoryMethod) -> Self {
        CategoryResult {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            method,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
