pub mod aggregate;
pub mod calc;
pub mod validate;

pub use aggregate::{total_rewards, RewardOptions};
pub use calc::{is_online, transaction_reward, RewardContext};
pub use validate::{validate_card, validate_transactions, ValidationError};
