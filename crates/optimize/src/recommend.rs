use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cardwise_core::{CardProfile, Category, Money, MonthKey, Transaction};
use cardwise_rewards::{total_rewards, RewardOptions};

use crate::score::find_optimal_card;

/// A category is "weak" below this average rate (percent).
const WEAK_RATE: Decimal = Decimal::ONE;
/// Category spend below this is immaterial.
const MATERIALITY_SPEND_RUPEES: i64 = 5_000;
/// Milestone opportunities worth less than this are noise.
const MIN_MILESTONE_BONUS_RUPEES: i64 = 100;
/// At most this many weak categories are reported.
const MAX_CATEGORY_RECS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    CardSwitch,
    CategoryOptimization,
    Milestone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub message: String,
    /// Rupee value of acting on this recommendation.
    pub estimated_benefit: Money,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub card_id: Option<String>,
    #[serde(default)]
    pub month: Option<MonthKey>,
}

/// Produce the flat, priority-tagged recommendation list for a user's
/// current card against the alternatives. Sorted by priority only; order
/// within a tier is emission order.
pub fn optimization_recommendations(
    transactions: &[Transaction],
    current: &CardProfile,
    alternatives: &[CardProfile],
) -> Vec<Recommendation> {
    let current_agg = total_rewards(transactions, current, RewardOptions::with_projections());
    let current_net = current_agg.total_reward - current.annual_fee;

    let mut recommendations = Vec::new();

    // Card switch: only when an alternative nets strictly more over the
    // identical transaction set. Net of fees — a higher raw reward that is
    // eaten by the annual fee is not a win.
    if let Some(best) = find_optimal_card(transactions, alternatives).into_iter().next() {
        if best.net_benefit > current_net {
            let delta = best.net_benefit - current_net;
            recommendations.push(Recommendation {
                kind: RecommendationKind::CardSwitch,
                priority: Priority::High,
                message: format!(
                    "Switching to {} would net {} more per statement period after its {} annual fee",
                    best.card_name, delta, best.annual_fee,
                ),
                estimated_benefit: delta,
                category: None,
                card_id: Some(best.card_id.clone()),
                month: None,
            });
        }
    }

    // Weak categories: material spend earning under 1%.
    let materiality = Money::from_rupees(MATERIALITY_SPEND_RUPEES);
    let mut weak: Vec<(&Category, &cardwise_core::GroupTotals)> = current_agg
        .by_category
        .iter()
        .filter(|(_, totals)| totals.rate < WEAK_RATE && totals.spend > materiality)
        .collect();
    weak.sort_by(|a, b| b.1.spend.cmp(&a.1.spend));
    for (category, totals) in weak.into_iter().take(MAX_CATEGORY_RECS) {
        recommendations.push(Recommendation {
            kind: RecommendationKind::CategoryOptimization,
            priority: Priority::Medium,
            message: format!(
                "{} of {category} spend earns only {:.2}% on {}",
                totals.spend, totals.rate, current.name,
            ),
            estimated_benefit: totals.spend.percent(WEAK_RATE) - totals.reward,
            category: Some(*category),
            card_id: Some(current.id.clone()),
            month: None,
        });
    }

    // Milestone shortfalls worth chasing.
    if let Some(projections) = &current_agg.projections {
        let floor = Money::from_rupees(MIN_MILESTONE_BONUS_RUPEES);
        for shortfall in &projections.milestone_opportunities {
            if shortfall.potential_bonus > floor {
                recommendations.push(Recommendation {
                    kind: RecommendationKind::Milestone,
                    priority: Priority::Medium,
                    message: format!(
                        "Spend {} more in {} to cross the {} milestone for {} extra",
                        shortfall.additional_spend,
                        shortfall.month,
                        shortfall.threshold,
                        shortfall.potential_bonus,
                    ),
                    estimated_benefit: shortfall.potential_bonus,
                    category: None,
                    card_id: Some(current.id.clone()),
                    month: Some(shortfall.month),
                });
            }
        }
    }

    recommendations.sort_by_key(|r| r.priority);
    recommendations
}
