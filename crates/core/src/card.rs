use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::category::Category;
use super::money::Money;
use super::period::{DateRange, MonthKey};
use super::transaction::Transaction;

/// What an offer pays out as. Closed set so reward math can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitType {
    Cashback,
    Points,
    SurchargeWaiver,
    Discount,
}

/// A time-bounded, merchant- or category-scoped bonus layered on top of a
/// card's base rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Additive reward rate (percent).
    pub rate: Decimal,
    pub benefit: BenefitType,
    #[serde(default)]
    pub category: Option<Category>,
    /// Merchant tokens this offer is scoped to; empty means category-scoped only.
    #[serde(default)]
    pub merchants: Vec<String>,
    #[serde(default = "Money::zero")]
    pub min_spend: Money,
    #[serde(default)]
    pub max_benefit: Option<Money>,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
}

impl Offer {
    /// An offer applies only when the transaction date falls in the validity
    /// window, the merchant or category matches, and the amount clears the
    /// minimum spend.
    pub fn applies_to(&self, tx: &Transaction) -> bool {
        if !DateRange::new(self.valid_from, self.valid_to).contains(tx.date) {
            return false;
        }
        if tx.amount < self.min_spend {
            return false;
        }
        let merchant_match = !self.merchants.is_empty()
            && self.merchants.iter().any(|m| {
                let m = m.to_lowercase();
                tx.merchant.to_lowercase().contains(&m)
                    || tx.description.to_lowercase().contains(&m)
            });
        let category_match = self.category.is_some_and(|c| c == tx.category);
        merchant_match || category_match
    }
}

/// A cumulative monthly-spend threshold that unlocks an additive rate bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub threshold: Money,
    /// Additive rate increment (percent) applied to the crossing transaction.
    pub bonus_rate: Decimal,
}

/// Structural category bonuses independent of time-bounded offers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryBonus {
    /// Extra rate for food transactions on Saturday/Sunday.
    #[serde(default)]
    pub weekend_dining: Option<Decimal>,
    /// Extra rate for shopping transactions flagged as online.
    #[serde(default)]
    pub online_shopping: Option<Decimal>,
    /// Extra rate for any transaction in one of `premium_categories`.
    #[serde(default)]
    pub premium_rate: Option<Decimal>,
    #[serde(default)]
    pub premium_categories: Vec<Category>,
}

/// The reward-earning rules of one credit card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    /// Explicit reward rate (percent) per category.
    #[serde(default)]
    pub category_rates: HashMap<Category, Decimal>,
    /// General rate when no category rate applies.
    #[serde(default)]
    pub default_rate: Option<Decimal>,
    /// The card's headline category, e.g. a dining-first card.
    #[serde(default)]
    pub primary_category: Option<Category>,
    #[serde(default)]
    pub primary_rate: Option<Decimal>,
    #[serde(default)]
    pub bonuses: CategoryBonus,
    /// Monthly cumulative-spend milestones, checked in ascending order.
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Monthly reward cap per category.
    #[serde(default)]
    pub category_caps: HashMap<Category, Money>,
    /// Card-wide annual reward cap.
    #[serde(default)]
    pub annual_cap: Option<Money>,
    #[serde(default = "Money::zero")]
    pub annual_fee: Money,
    #[serde(default)]
    pub premium_features: Vec<String>,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

impl CardProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        CardProfile {
            id: id.into(),
            name: name.into(),
            issuer: None,
            category_rates: HashMap::new(),
            default_rate: None,
            primary_category: None,
            primary_rate: None,
            bonuses: CategoryBonus::default(),
            milestones: Vec::new(),
            category_caps: HashMap::new(),
            annual_cap: None,
            annual_fee: Money::zero(),
            premium_features: Vec::new(),
            offers: Vec::new(),
        }
    }

    /// Base rate resolution: explicit category rate, then the declared
    /// primary-category rate, then the card's general rate, then the
    /// category's global default.
    pub fn base_rate(&self, category: Category) -> Decimal {
        if let Some(rate) = self.category_rates.get(&category) {
            return *rate;
        }
        if self.primary_category == Some(category) {
            if let Some(rate) = self.primary_rate {
                return rate;
            }
        }
        if let Some(rate) = self.default_rate {
            return rate;
        }
        category.default_rate()
    }
}

/// Per-transaction reward outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardResult {
    pub reward: Money,
    /// Effective total rate (percent) before capping.
    pub rate: Decimal,
    pub breakdown: RewardBreakdown,
    /// True when a cap truncated the computed reward.
    pub capped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub base_rate: Decimal,
    pub category_bonus: Decimal,
    pub milestone_bonus: Decimal,
    pub offer_bonus: Decimal,
}

impl RewardBreakdown {
    pub fn total(&self) -> Decimal {
        self.base_rate + self.category_bonus + self.milestone_bonus + self.offer_bonus
    }
}

/// Spend/reward totals for one aggregation group (a category or a month).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupTotals {
    pub spend: Money,
    pub reward: Money,
    /// reward / spend × 100.
    pub rate: Decimal,
    pub count: usize,
}

/// A "spend ₹X more in month M to cross milestone Y" opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneShortfall {
    pub month: MonthKey,
    pub threshold: Money,
    pub additional_spend: Money,
    pub bonus_rate: Decimal,
    pub potential_bonus: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projections {
    /// Average monthly reward × 12.
    pub annual_reward: Money,
    /// Ranked milestone shortfalls, top 5 by potential bonus.
    pub milestone_opportunities: Vec<MilestoneShortfall>,
}

/// Rewards aggregated over a transaction set for one card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    pub card_id: String,
    pub total_spend: Money,
    pub total_reward: Money,
    /// total_reward / total_spend × 100.
    pub average_rate: Decimal,
    pub transaction_count: usize,
    pub capped_count: usize,
    pub by_category: BTreeMap<Category, GroupTotals>,
    pub by_month: BTreeMap<MonthKey, GroupTotals>,
    #[serde(default)]
    pub projections: Option<Projections>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pct(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tx(desc: &str, merchant: &str, amount: i64, d: NaiveDate, cat: Category) -> Transaction {
        let mut tx = Transaction::new(d, desc.to_string(), Money::from_rupees(amount));
        tx.merchant = merchant.to_string();
        tx.category = cat;
        tx
    }

    fn offer(category: Option<Category>, merchants: Vec<&str>) -> Offer {
        Offer {
            rate: pct("2"),
            benefit: BenefitType::Cashback,
            category,
            merchants: merchants.into_iter().map(String::from).collect(),
            min_spend: Money::from_rupees(100),
            max_benefit: None,
            valid_from: date(2025, 8, 1),
            valid_to: date(2025, 8, 31),
        }
    }

    #[test]
    fn offer_applies_within_window_and_category() {
        let o = offer(Some(Category::Food), vec![]);
        let t = tx("ZOMATO ORDER", "zomato", 540, date(2025, 8, 10), Category::Food);
        assert!(o.applies_to(&t));
    }

    #[test]
    fn offer_rejects_outside_date_window() {
        let o = offer(Some(Category::Food), vec![]);
        let t = tx("ZOMATO ORDER", "zomato", 540, date(2025, 9, 1), Category::Food);
        assert!(!o.applies_to(&t));
    }

    #[test]
    fn offer_rejects_below_min_spend() {
        let o = offer(Some(Category::Food), vec![]);
        let t = tx("ZOMATO ORDER", "zomato", 99, date(2025, 8, 10), Category::Food);
        assert!(!o.applies_to(&t));
    }

    #[test]
    fn offer_matches_by_merchant_token() {
        let o = offer(None, vec!["zomato"]);
        let t = tx("ZOMATO ORDER 1234", "zomato order", 540, date(2025, 8, 10), Category::Others);
        assert!(o.applies_to(&t));
    }

    #[test]
    fn offer_no_match_without_merchant_or_category() {
        let o = offer(None, vec!["swiggy"]);
        let t = tx("ZOMATO ORDER", "zomato", 540, date(2025, 8, 10), Category::Food);
        assert!(!o.applies_to(&t));
    }

    #[test]
    fn base_rate_prefers_explicit_category_rate() {
        let mut card = CardProfile::new("c1", "Test");
        card.category_rates.insert(Category::Food, pct("5"));
        card.default_rate = Some(pct("1"));
        assert_eq!(card.base_rate(Category::Food), pct("5"));
    }

    #[test]
    fn base_rate_falls_back_to_primary_category() {
        let mut card = CardProfile::new("c1", "Test");
        card.primary_category = Some(Category::Travel);
        card.primary_rate = Some(pct("3"));
        assert_eq!(card.base_rate(Category::Travel), pct("3"));
        // Non-primary categories skip the primary rate.
        assert_ne!(card.base_rate(Category::Food), pct("3"));
    }

    #[test]
    fn base_rate_falls_back_to_default_then_global() {
        let mut card = CardProfile::new("c1", "Test");
        card.default_rate = Some(pct("1.2"));
        assert_eq!(card.base_rate(Category::Shopping), pct("1.2"));

        let bare = CardProfile::new("c2", "Bare");
        assert_eq!(bare.base_rate(Category::Others), Category::Others.default_rate());
    }

    #[test]
    fn breakdown_total_is_sum_of_parts() {
        let b = RewardBreakdown {
            base_rate: pct("1"),
            category_bonus: pct("0.5"),
            milestone_bonus: pct("0.1"),
            offer_bonus: pct("2"),
        };
        assert_eq!(b.total(), pct("3.6"));
    }

    #[test]
    fn card_profile_deserializes_sparse_json() {
        let card: CardProfile = serde_json::from_str(
            r#"{"id": "hdfc-mb", "name": "Millennia", "category_rates": {"food": "5"}}"#,
        )
        .unwrap();
        assert_eq!(card.base_rate(Category::Food), pct("5"));
        assert!(card.offers.is_empty());
        assert!(card.annual_fee.is_zero());
    }
}
