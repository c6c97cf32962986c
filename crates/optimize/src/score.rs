use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use cardwise_core::{AggregateResult, CardProfile, Money, Transaction};
use cardwise_rewards::{total_rewards, RewardOptions};

/// Each premium feature adds this much to the score, up to the cap. Keeps
/// the term comparable to the rate-consistency term.
const PREMIUM_FEATURE_WEIGHT: f64 = 0.5;
const PREMIUM_FEATURE_CAP: f64 = 2.0;

/// One card's outcome over a transaction set, with its ranking score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardComparison {
    pub card_id: String,
    pub card_name: String,
    pub score: f64,
    pub total_reward: Money,
    /// Total reward minus the annual fee.
    pub net_benefit: Money,
    pub annual_fee: Money,
    pub aggregate: AggregateResult,
}

/// Run the reward calculator against every candidate and rank descending by
/// score. The sort is stable: equal scores keep first-seen order, so the
/// same inputs always produce the same ranking.
pub fn find_optimal_card(
    transactions: &[Transaction],
    cards: &[CardProfile],
) -> Vec<CardComparison> {
    let mut comparisons: Vec<CardComparison> = cards
        .iter()
        .map(|card| {
            let aggregate = total_rewards(transactions, card, RewardOptions::default());
            let score = ranking_score(card, &aggregate);
            CardComparison {
                card_id: card.id.clone(),
                card_name: card.name.clone(),
                score,
                total_reward: aggregate.total_reward,
                net_benefit: aggregate.total_reward - card.annual_fee,
                annual_fee: card.annual_fee,
                aggregate,
            }
        })
        .collect();

    comparisons.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    comparisons
}

/// `avg_rate × 20 − fee/1000 + (10 − stddev(category rates)) + premium bonus`.
///
/// The variance term rewards cards whose benefit is consistent across the
/// user's actual spending mix instead of concentrated in one category they
/// rarely use.
pub fn ranking_score(card: &CardProfile, aggregate: &AggregateResult) -> f64 {
    let avg_rate = aggregate.average_rate.to_f64().unwrap_or(0.0);
    let fee = card.annual_fee.as_decimal().to_f64().unwrap_or(0.0);

    let category_rates: Vec<f64> = aggregate
        .by_category
        .values()
        .map(|g| g.rate.to_f64().unwrap_or(0.0))
        .collect();

    let premium_bonus =
        (card.premium_features.len() as f64 * PREMIUM_FEATURE_WEIGHT).min(PREMIUM_FEATURE_CAP);

    avg_rate * 20.0 - fee / 1000.0 + (10.0 - stddev(&category_rates)) + premium_bonus
}

fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
