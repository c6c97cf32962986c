use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use cardwise_core::{
    AggregateResult, CardProfile, Category, GroupTotals, MilestoneShortfall, Money, MonthKey,
    Projections, Transaction,
};

use crate::calc::{transaction_reward, RewardContext};

/// At most this many milestone opportunities are reported.
const MAX_OPPORTUNITIES: usize = 5;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RewardOptions {
    #[serde(default)]
    pub include_projections: bool,
    #[serde(default)]
    pub annual_projection: bool,
    #[serde(default)]
    pub milestone_projections: bool,
}

impl RewardOptions {
    pub fn with_projections() -> Self {
        RewardOptions {
            include_projections: true,
            annual_projection: true,
            milestone_projections: true,
        }
    }
}

/// Score a transaction set against one card: per-transaction accrual in date
/// order with running monthly/annual context, grouped by category and month.
pub fn total_rewards(
    transactions: &[Transaction],
    card: &CardProfile,
    options: RewardOptions,
) -> AggregateResult {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let mut monthly_spend: HashMap<MonthKey, Money> = HashMap::new();
    let mut monthly_category_reward: HashMap<(MonthKey, Category), Money> = HashMap::new();
    let mut annual_reward = Money::zero();

    let mut by_category: BTreeMap<Category, GroupTotals> = BTreeMap::new();
    let mut by_month: BTreeMap<MonthKey, GroupTotals> = BTreeMap::new();
    let mut total_reward = Money::zero();
    let mut total_spend = Money::zero();
    let mut capped_count = 0;

    for tx in &ordered {
        let month = MonthKey::of(tx.date);
        let ctx = RewardContext {
            monthly_spend_before: monthly_spend.get(&month).copied().unwrap_or_else(Money::zero),
            monthly_category_reward: monthly_category_reward
                .get(&(month, tx.category))
                .copied()
                .unwrap_or_else(Money::zero),
            annual_reward,
        };

        let result = transaction_reward(tx, card, &ctx);

        *monthly_spend.entry(month).or_insert_with(Money::zero) += tx.amount;
        *monthly_category_reward
            .entry((month, tx.category))
            .or_insert_with(Money::zero) += result.reward;
        annual_reward += result.reward;

        accumulate(by_category.entry(tx.category).or_default(), tx.amount, result.reward);
        accumulate(by_month.entry(month).or_default(), tx.amount, result.reward);

        total_spend += tx.amount;
        total_reward += result.reward;
        if result.capped {
            capped_count += 1;
        }
    }

    for totals in by_category.values_mut().chain(by_month.values_mut()) {
        totals.rate = rate_of(totals.reward, totals.spend);
    }

    let projections = options.include_projections.then(|| Projections {
        annual_reward: if options.annual_projection {
            annualize(total_reward, by_month.len())
        } else {
            Money::zero()
        },
        milestone_opportunities: if options.milestone_projections {
            milestone_shortfalls(card, &monthly_spend)
        } else {
            Vec::new()
        },
    });

    AggregateResult {
        card_id: card.id.clone(),
        total_spend,
        total_reward,
        average_rate: rate_of(total_reward, total_spend),
        transaction_count: ordered.len(),
        capped_count,
        by_category,
        by_month,
        projections,
    }
}

fn accumulate(totals: &mut GroupTotals, spend: Money, reward: Money) {
    totals.spend += spend;
    totals.reward += reward;
    totals.count += 1;
}

fn rate_of(reward: Money, spend: Money) -> Decimal {
    if spend.is_zero() {
        return Decimal::ZERO;
    }
    (reward.as_decimal() / spend.as_decimal() * Decimal::from(100)).round_dp(4)
}

/// Naive annualization: average monthly reward × 12.
fn annualize(total_reward: Money, month_count: usize) -> Money {
    if month_count == 0 {
        return Money::zero();
    }
    Money::from_decimal(total_reward.as_decimal() / Decimal::from(month_count as i64) * Decimal::from(12))
}

/// For each month, how much more spend would cross the next uncrossed
/// threshold, and what the crossing would be worth. Ranked by potential
/// bonus, top 5.
pub fn milestone_shortfalls(
    card: &CardProfile,
    monthly_spend: &HashMap<MonthKey, Money>,
) -> Vec<MilestoneShortfall> {
    let mut milestones = card.milestones.clone();
    milestones.sort_by(|a, b| a.threshold.cmp(&b.threshold));

    let mut opportunities: Vec<MilestoneShortfall> = monthly_spend
        .iter()
        .filter_map(|(month, spend)| {
            let next = milestones.iter().find(|m| m.threshold > *spend)?;
            let additional = next.threshold - *spend;
            Some(MilestoneShortfall {
                month: *month,
                threshold: next.threshold,
                additional_spend: additional,
                bonus_rate: next.bonus_rate,
                potential_bonus: additional.percent(next.bonus_rate),
            })
        })
        .collect();

    opportunities.sort_by(|a, b| {
        b.potential_bonus
            .cmp(&a.potential_bonus)
            .then_with(|| a.month.cmp(&b.month))
    });
    opportunities.truncate(MAX_OPPORTUNITIES);
    opportunities
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardwise_core::Milestone;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn pct(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(amount: i64, d: NaiveDate, cat: Category) -> Transaction {
        let mut tx = Transaction::new(
            d,
            format!("TX {amount} {d}"),
            Money::from_rupees(amount),
        );
        tx.category = cat;
        tx
    }

    fn food_card(rate: &str) -> CardProfile {
        let mut card = CardProfile::new("c1", "Food Card");
        card.category_rates.insert(Category::Food, pct(rate));
        card
    }

    #[test]
    fn totals_and_groups() {
        let card = food_card("5");
        let txs = vec![
            tx(540, date(2025, 8, 10), Category::Food),
            tx(1000, date(2025, 8, 15), Category::Shopping),
            tx(460, date(2025, 9, 1), Category::Food),
        ];
        let agg = total_rewards(&txs, &card, RewardOptions::default());

        assert_eq!(agg.transaction_count, 3);
        assert_eq!(agg.total_spend.to_paise(), 200000);
        assert_eq!(agg.by_category[&Category::Food].count, 2);
        assert_eq!(agg.by_month.len(), 2);
        // Food group rate is exactly the card's 5%.
        assert_eq!(agg.by_category[&Category::Food].rate, pct("5"));
    }

    #[test]
    fn milestone_context_threads_through_month() {
        // Scenario D at aggregate level: 6000 + 6000 crosses 10000 on tx 2.
        let mut card = food_card("1");
        card.milestones.push(Milestone {
            threshold: Money::from_rupees(10_000),
            bonus_rate: pct("0.1"),
        });
        let txs = vec![
            tx(6000, date(2025, 8, 5), Category::Food),
            tx(6000, date(2025, 8, 20), Category::Food),
        ];
        let agg = total_rewards(&txs, &card, RewardOptions::default());
        // 1% of 12000 = 120, plus 0.1% of the second 6000 = 6.
        assert_eq!(agg.total_reward.to_paise(), 12600);
    }

    #[test]
    fn milestone_resets_across_months() {
        let mut card = food_card("1");
        card.milestones.push(Milestone {
            threshold: Money::from_rupees(10_000),
            bonus_rate: pct("0.1"),
        });
        let txs = vec![
            tx(12_000, date(2025, 8, 5), Category::Food),
            tx(12_000, date(2025, 9, 5), Category::Food),
        ];
        let agg = total_rewards(&txs, &card, RewardOptions::default());
        // Each month's crossing fires once: 2 × (1% of 12000 + 0.1% of 12000).
        assert_eq!(agg.total_reward.to_paise(), 2 * (12000 + 1200));
    }

    #[test]
    fn category_cap_applies_per_month() {
        let mut card = food_card("5");
        card.category_caps.insert(Category::Food, Money::from_rupees(20));
        let txs = vec![
            tx(540, date(2025, 8, 10), Category::Food), // hits the cap
            tx(540, date(2025, 8, 15), Category::Food), // cap exhausted
            tx(540, date(2025, 9, 10), Category::Food), // new month, cap resets
        ];
        let agg = total_rewards(&txs, &card, RewardOptions::default());
        assert_eq!(agg.total_reward.to_paise(), 2000 + 0 + 2000);
        assert_eq!(agg.capped_count, 2);
    }

    #[test]
    fn average_rate_is_reward_over_spend() {
        let card = food_card("5");
        let txs = vec![tx(540, date(2025, 8, 10), Category::Food)];
        let agg = total_rewards(&txs, &card, RewardOptions::default());
        assert_eq!(agg.average_rate, pct("5"));
    }

    #[test]
    fn empty_set_yields_zero_aggregate() {
        let card = food_card("5");
        let agg = total_rewards(&[], &card, RewardOptions::default());
        assert!(agg.total_reward.is_zero());
        assert_eq!(agg.average_rate, Decimal::ZERO);
        assert!(agg.by_month.is_empty());
    }

    // ── Projections ───────────────────────────────────────────────────────────

    #[test]
    fn annual_projection_multiplies_average_month() {
        let card = food_card("5");
        let txs = vec![
            tx(1000, date(2025, 8, 10), Category::Food), // 50
            tx(1000, date(2025, 9, 10), Category::Food), // 50
        ];
        let agg = total_rewards(&txs, &card, RewardOptions::with_projections());
        let p = agg.projections.unwrap();
        // avg 50/month × 12 = 600
        assert_eq!(p.annual_reward.to_paise(), 60000);
    }

    #[test]
    fn milestone_shortfalls_ranked_and_capped() {
        let mut card = food_card("1");
        card.milestones.push(Milestone {
            threshold: Money::from_rupees(10_000),
            bonus_rate: pct("0.5"),
        });
        let mut monthly = HashMap::new();
        for m in 1..=8u32 {
            monthly.insert(MonthKey::new(2025, m), Money::from_rupees(1000 * m as i64));
        }
        let shortfalls = milestone_shortfalls(&card, &monthly);
        assert_eq!(shortfalls.len(), MAX_OPPORTUNITIES);
        // January (spend 1000) has the largest shortfall, hence largest bonus.
        assert_eq!(shortfalls[0].month, MonthKey::new(2025, 1));
        assert_eq!(shortfalls[0].additional_spend.to_paise(), 900000);
        assert_eq!(shortfalls[0].potential_bonus.to_paise(), 4500); // 0.5% of 9000
    }

    #[test]
    fn month_over_threshold_has_no_shortfall() {
        let mut card = food_card("1");
        card.milestones.push(Milestone {
            threshold: Money::from_rupees(10_000),
            bonus_rate: pct("0.5"),
        });
        let mut monthly = HashMap::new();
        monthly.insert(MonthKey::new(2025, 8), Money::from_rupees(15_000));
        assert!(milestone_shortfalls(&card, &monthly).is_empty());
    }

    #[test]
    fn projections_absent_by_default() {
        let card = food_card("5");
        let agg = total_rewards(&[], &card, RewardOptions::default());
        assert!(agg.projections.is_none());
    }
}
