use rust_decimal::Decimal;
use thiserror::Error;

use cardwise_core::{CardProfile, Transaction};

/// Caller-supplied shapes are rejected before any computation begins.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Card '{card}': {field} rate is negative")]
    NegativeRate { card: String, field: &'static str },
    #[error("Card '{card}': milestone threshold must be positive")]
    NonPositiveThreshold { card: String },
    #[error("Card '{card}': offer validity window is inverted")]
    InvertedOfferWindow { card: String },
    #[error("Card '{card}': annual fee is negative")]
    NegativeFee { card: String },
    #[error("Transaction '{id}': amount is negative")]
    NegativeAmount { id: String },
}

pub fn validate_card(card: &CardProfile) -> Result<(), ValidationError> {
    let name = || card.id.clone();

    for rate in card.category_rates.values() {
        if *rate < Decimal::ZERO {
            return Err(ValidationError::NegativeRate {
                card: name(),
                field: "category",
            });
        }
    }
    if card.default_rate.is_some_and(|r| r < Decimal::ZERO) {
        return Err(ValidationError::NegativeRate {
            card: name(),
            field: "default",
        });
    }
    for milestone in &card.milestones {
        if milestone.threshold.is_zero() || milestone.threshold.is_negative() {
            return Err(ValidationError::NonPositiveThreshold { card: name() });
        }
        if milestone.bonus_rate < Decimal::ZERO {
            return Err(ValidationError::NegativeRate {
                card: name(),
                field: "milestone",
            });
        }
    }
    for offer in &card.offers {
        if offer.valid_to < offer.valid_from {
            return Err(ValidationError::InvertedOfferWindow { card: name() });
        }
        if offer.rate < Decimal::ZERO {
            return Err(ValidationError::NegativeRate {
                card: name(),
                field: "offer",
            });
        }
    }
    if card.annual_fee.is_negative() {
        return Err(ValidationError::NegativeFee { card: name() });
    }

    Ok(())
}

pub fn validate_transactions(transactions: &[Transaction]) -> Result<(), ValidationError> {
    for tx in transactions {
        if tx.amount.is_negative() {
            return Err(ValidationError::NegativeAmount { id: tx.id.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardwise_core::{BenefitType, Category, Milestone, Money, Offer};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn valid_card_passes() {
        let mut card = CardProfile::new("c1", "OK");
        card.category_rates
            .insert(Category::Food, Decimal::from_str("5").unwrap());
        assert!(validate_card(&card).is_ok());
    }

    #[test]
    fn negative_category_rate_rejected() {
        let mut card = CardProfile::new("c1", "Bad");
        card.category_rates
            .insert(Category::Food, Decimal::from_str("-1").unwrap());
        assert!(matches!(
            validate_card(&card),
            Err(ValidationError::NegativeRate { field: "category", .. })
        ));
    }

    #[test]
    fn zero_milestone_threshold_rejected() {
        let mut card = CardProfile::new("c1", "Bad");
        card.milestones.push(Milestone {
            threshold: Money::zero(),
            bonus_rate: Decimal::ONE,
        });
        assert!(matches!(
            validate_card(&card),
            Err(ValidationError::NonPositiveThreshold { .. })
        ));
    }

    #[test]
    fn inverted_offer_window_rejected() {
        let mut card = CardProfile::new("c1", "Bad");
        card.offers.push(Offer {
            rate: Decimal::ONE,
            benefit: BenefitType::Cashback,
            category: Some(Category::Food),
            merchants: vec![],
            min_spend: Money::zero(),
            max_benefit: None,
            valid_from: date(2025, 8, 31),
            valid_to: date(2025, 8, 1),
        });
        assert!(matches!(
            validate_card(&card),
            Err(ValidationError::InvertedOfferWindow { .. })
        ));
    }

    #[test]
    fn negative_transaction_amount_rejected() {
        let mut tx = Transaction::new(
            date(2025, 8, 10),
            "REFUND".to_string(),
            Money::from_rupees(100),
        );
        tx.amount = Money::zero() - Money::from_rupees(5);
        assert!(validate_transactions(&[tx]).is_err());
    }
}
