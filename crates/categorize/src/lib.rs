pub mod categorizer;
pub mod classifier;
pub mod merchants;
pub mod patterns;
pub mod rules;

pub use categorizer::{Categorizer, CategoryStrategy, CONFIDENCE_THRESHOLD, LEARN_THRESHOLD};
pub use classifier::{Classifier, ClassifierError, ClassifierVerdict, HttpClassifier, MockClassifier};
pub use merchants::MerchantDb;
pub use patterns::{LearnedPattern, MemoryPatternStore, UserPatternStore};
pub use rules::{RuleEngine, RuleError};
