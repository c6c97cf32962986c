use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The fixed set of spending categories a transaction can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Fuel,
    Grocery,
    Shopping,
    Travel,
    Entertainment,
    Utilities,
    Medical,
    Atm,
    Transfer,
    Insurance,
    Investment,
    Others,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Food,
        Category::Fuel,
        Category::Grocery,
        Category::Shopping,
        Category::Travel,
        Category::Entertainment,
        Category::Utilities,
        Category::Medical,
        Category::Atm,
        Category::Transfer,
        Category::Insurance,
        Category::Investment,
        Category::Others,
    ];

    /// Industry-typical default reward rate (percent) when a card declares
    /// no rate for the category.
    pub fn default_rate(self) -> Decimal {
        match self {
            Category::Food => Decimal::new(15, 1),          // 1.5
            Category::Fuel => Decimal::new(10, 1),          // 1.0
            Category::Grocery => Decimal::new(10, 1),       // 1.0
            Category::Shopping => Decimal::new(10, 1),      // 1.0
            Category::Travel => Decimal::new(15, 1),        // 1.5
            Category::Entertainment => Decimal::new(10, 1), // 1.0
            Category::Utilities => Decimal::new(5, 1),      // 0.5
            Category::Medical => Decimal::new(5, 1),        // 0.5
            Category::Atm => Decimal::ZERO,
            Category::Transfer => Decimal::ZERO,
            Category::Insurance => Decimal::new(5, 1),  // 0.5
            Category::Investment => Decimal::new(5, 1), // 0.5
            Category::Others => Decimal::new(5, 1),     // 0.5
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Food => "food",
            Category::Fuel => "fuel",
            Category::Grocery => "grocery",
            Category::Shopping => "shopping",
            Category::Travel => "travel",
            Category::Entertainment => "entertainment",
            Category::Utilities => "utilities",
            Category::Medical => "medical",
            Category::Atm => "atm",
            Category::Transfer => "transfer",
            Category::Insurance => "insurance",
            Category::Investment => "investment",
            Category::Others => "others",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "food" | "dining" => Ok(Category::Food),
            "fuel" => Ok(Category::Fuel),
            "grocery" | "groceries" => Ok(Category::Grocery),
            "shopping" => Ok(Category::Shopping),
            "travel" => Ok(Category::Travel),
            "entertainment" => Ok(Category::Entertainment),
            "utilities" | "utility" => Ok(Category::Utilities),
            "medical" | "health" => Ok(Category::Medical),
            "atm" => Ok(Category::Atm),
            "transfer" => Ok(Category::Transfer),
            "insurance" => Ok(Category::Insurance),
            "investment" => Ok(Category::Investment),
            "others" | "other" => Ok(Category::Others),
            other => Err(format!("Unknown category: '{other}'")),
        }
    }
}
