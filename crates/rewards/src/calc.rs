use chrono::Datelike;
use rust_decimal::Decimal;

use cardwise_core::{
    BenefitType, CardProfile, Category, Money, Offer, RewardBreakdown, RewardResult, Transaction,
};

/// Description tokens that flag a transaction as online. A heuristic with no
/// ground truth — known-imprecise, kept as-is.
const ONLINE_TOKENS: &[&str] = &[
    "amazon", "flipkart", "myntra", "ajio", "meesho", "online", "ecom", "razorpay", "payu",
    "paytm", "phonepe", "gpay", ".com", "www",
];

pub fn is_online(description: &str) -> bool {
    let text = description.to_lowercase();
    ONLINE_TOKENS.iter().any(|t| text.contains(t))
}

/// Running accrual state the caller carries across a month/year of
/// transactions. All zero for a standalone calculation.
#[derive(Debug, Clone, Default)]
pub struct RewardContext {
    /// Cumulative spend in the transaction's month, before this transaction.
    pub monthly_spend_before: Money,
    /// Reward already accrued this month in the transaction's category.
    pub monthly_category_reward: Money,
    /// Reward already accrued against the card's annual cap.
    pub annual_reward: Money,
}

/// Compute one transaction's reward on one card.
///
/// Rate assembly order: base → category bonus → milestone bonus → offer
/// bonus; then the per-category monthly cap and the annual cap truncate the
/// amount, reported via `capped`.
pub fn transaction_reward(
    tx: &Transaction,
    card: &CardProfile,
    ctx: &RewardContext,
) -> RewardResult {
    let base_rate = card.base_rate(tx.category);
    let category_bonus = category_bonus(tx, card);
    let milestone_bonus = milestone_bonus(tx, card, ctx);

    let (offer_bonus, offer_reward) = offer_reward(tx, card);

    let breakdown = RewardBreakdown {
        base_rate,
        category_bonus,
        milestone_bonus,
        offer_bonus,
    };

    let mut reward =
        tx.amount.percent(base_rate + category_bonus + milestone_bonus) + offer_reward;
    let mut capped = false;

    if let Some(cap) = card.category_caps.get(&tx.category) {
        let remaining = floor_zero(*cap - ctx.monthly_category_reward);
        if reward > remaining {
            reward = remaining;
            capped = true;
        }
    }
    if let Some(cap) = card.annual_cap {
        let remaining = floor_zero(cap - ctx.annual_reward);
        if reward > remaining {
            reward = remaining;
            capped = true;
        }
    }

    RewardResult {
        reward,
        rate: breakdown.total(),
        breakdown,
        capped,
    }
}

/// Structural bonuses independent of time-bounded offers: weekend dining,
/// online shopping, premium-category membership. Additive.
fn category_bonus(tx: &Transaction, card: &CardProfile) -> Decimal {
    let mut bonus = Decimal::ZERO;

    if tx.category == Category::Food {
        if let Some(rate) = card.bonuses.weekend_dining {
            let weekday = tx.date.weekday();
            if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
                bonus += rate;
            }
        }
    }
    if tx.category == Category::Shopping && is_online(&tx.description) {
        if let Some(rate) = card.bonuses.online_shopping {
            bonus += rate;
        }
    }
    if card.bonuses.premium_categories.contains(&tx.category) {
        if let Some(rate) = card.bonuses.premium_rate {
            bonus += rate;
        }
    }

    bonus
}

/// Only the first threshold crossed by THIS transaction fires: the pre- and
/// post-transaction cumulative monthly spend must straddle it. Thresholds
/// already crossed earlier in the month never re-fire.
fn milestone_bonus(tx: &Transaction, card: &CardProfile, ctx: &RewardContext) -> Decimal {
    let pre = ctx.monthly_spend_before;
    let post = pre + tx.amount;

    let mut milestones = card.milestones.clone();
    milestones.sort_by(|a, b| a.threshold.cmp(&b.threshold));

    milestones
        .iter()
        .find(|m| pre < m.threshold && m.threshold <= post)
        .map(|m| m.bonus_rate)
        .unwrap_or(Decimal::ZERO)
}

/// Sum every active offer's contribution. An offer's own `max_benefit`
/// truncates its contribution; the card-level caps are applied by the caller.
fn offer_reward(tx: &Transaction, card: &CardProfile) -> (Decimal, Money) {
    let mut total_rate = Decimal::ZERO;
    let mut total_reward = Money::zero();

    for offer in &card.offers {
        if !offer.applies_to(tx) {
            continue;
        }
        let contribution = benefit_amount(offer, tx);
        total_rate += offer.rate;
        total_reward += contribution;
    }

    (total_rate, total_reward)
}

/// The benefit type set is closed so this match stays exhaustive; every
/// variant currently accrues as a rate on the transaction amount.
fn benefit_amount(offer: &Offer, tx: &Transaction) -> Money {
    let raw = match offer.benefit {
        BenefitType::Cashback | BenefitType::Points => tx.amount.percent(offer.rate),
        BenefitType::SurchargeWaiver | BenefitType::Discount => tx.amount.percent(offer.rate),
    };
    match offer.max_benefit {
        Some(cap) => raw.min(cap),
        None => raw,
    }
}

fn floor_zero(m: Money) -> Money {
    if m.is_negative() {
        Money::zero()
    } else {
        m
    }
}
