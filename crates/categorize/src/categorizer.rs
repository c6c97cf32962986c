use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use cardwise_core::{Category, CategoryMethod, CategoryResult, Transaction};

use crate::classifier::Classifier;
use crate::merchants::MerchantDb;
use crate::patterns::{self, UserPatternStore};
use crate::rules::RuleEngine;

/// First strategy result at or above this confidence wins.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;
/// Results at or above this confidence feed the per-user pattern store.
pub const LEARN_THRESHOLD: f32 = 0.8;

/// Batch chunking keeps external-classifier traffic under its rate limits.
const CHUNK_SIZE: usize = 10;
const CHUNK_PACING: Duration = Duration::from_millis(500);

/// One tier of the resolution chain. Returning `None` means "no opinion";
/// the chain moves on. Strategies never error — degraded confidence is the
/// only failure signal.
#[async_trait]
pub trait CategoryStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn attempt(&self, tx: &Transaction, user_id: Option<&str>) -> Option<CategoryResult>;
}

// ── Built-in strategies ──────────────────────────────────────────────────────

struct RuleStrategy(RuleEngine);

#[async_trait]
impl CategoryStrategy for RuleStrategy {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn attempt(&self, tx: &Transaction, _user_id: Option<&str>) -> Option<CategoryResult> {
        self.0.evaluate(tx)
    }
}

struct MerchantDbStrategy(MerchantDb);

#[async_trait]
impl CategoryStrategy for MerchantDbStrategy {
    fn name(&self) -> &'static str {
        "merchant_db"
    }

    async fn attempt(&self, tx: &Transaction, _user_id: Option<&str>) -> Option<CategoryResult> {
        self.0.lookup(tx)
    }
}

struct UserPatternStrategy(Arc<dyn UserPatternStore>);

#[async_trait]
impl CategoryStrategy for UserPatternStrategy {
    fn name(&self) -> &'static str {
        "user_pattern"
    }

    async fn attempt(&self, tx: &Transaction, user_id: Option<&str>) -> Option<CategoryResult> {
        let user_id = user_id?;
        patterns::match_patterns(&self.0.patterns(user_id), tx)
    }
}

struct ClassifierStrategy(Arc<dyn Classifier>);

#[async_trait]
impl CategoryStrategy for ClassifierStrategy {
    fn name(&self) -> &'static str {
        "classifier"
    }

    async fn attempt(&self, tx: &Transaction, _user_id: Option<&str>) -> Option<CategoryResult> {
        match self.0.classify(&tx.description, tx.amount).await {
            Ok(verdict) => Some(
                CategoryResult::new(verdict.category, verdict.confidence, CategoryMethod::Classifier)
                    .with_details(verdict.reasoning),
            ),
            Err(e) => {
                // Unreliable infrastructure: no opinion, fall through.
                tracing::debug!(error = %e, "classifier unavailable");
                None
            }
        }
    }
}

// ── Categorizer ──────────────────────────────────────────────────────────────

/// Runs the ordered strategy chain until a tier clears the confidence
/// threshold. Categorization is pure; learning is the separate `learn` call.
pub struct Categorizer {
    strategies: Vec<Box<dyn CategoryStrategy>>,
    store: Arc<dyn UserPatternStore>,
}

impl Categorizer {
    /// The standard five-tier chain: rules, merchant table, user patterns,
    /// external classifier (if any), then the default fallback.
    pub fn new(store: Arc<dyn UserPatternStore>, classifier: Option<Arc<dyn Classifier>>) -> Self {
        let mut strategies: Vec<Box<dyn CategoryStrategy>> = vec![
            Box::new(RuleStrategy(RuleEngine::with_defaults())),
            Box::new(MerchantDbStrategy(MerchantDb::with_defaults())),
            Box::new(UserPatternStrategy(Arc::clone(&store))),
        ];
        if let Some(classifier) = classifier {
            strategies.push(Box::new(ClassifierStrategy(classifier)));
        }
        Self { strategies, store }
    }

    /// Append a custom tier at the end of the chain (before the implicit
    /// fallback, which is not a strategy).
    pub fn push_strategy(&mut self, strategy: Box<dyn CategoryStrategy>) {
        self.strategies.push(strategy);
    }

    /// Pure resolution: never errors, never mutates the pattern store.
    pub async fn categorize(&self, tx: &Transaction, user_id: Option<&str>) -> CategoryResult {
        for strategy in &self.strategies {
            if let Some(result) = strategy.attempt(tx, user_id).await {
                if result.confidence >= CONFIDENCE_THRESHOLD {
                    tracing::trace!(
                        strategy = strategy.name(),
                        category = %result.category,
                        confidence = result.confidence,
                        "categorized"
                    );
                    return result;
                }
            }
        }
        CategoryResult::new(Category::Others, 0.5, CategoryMethod::Fallback)
    }

    /// Feed a high-confidence result back into the user's pattern store.
    /// Callers opt in; tests and read-only analysis simply skip this.
    pub fn learn(&self, user_id: &str, tx: &Transaction, result: &CategoryResult) {
        if result.confidence < LEARN_THRESHOLD {
            return;
        }
        if let Some(pattern) = patterns::pattern_for(tx) {
            self.store.record(user_id, result.category, &pattern);
        }
    }

    /// Order-preserving batch resolution in fixed-size chunks with a pacing
    /// delay between chunks, respecting external-classifier rate limits.
    pub async fn categorize_batch(
        &self,
        transactions: &[Transaction],
        user_id: Option<&str>,
    ) -> Vec<CategoryResult> {
        let mut results = Vec::with_capacity(transactions.len());
        let mut chunks = transactions.chunks(CHUNK_SIZE).peekable();
        while let Some(chunk) = chunks.next() {
            for tx in chunk {
                results.push(self.categorize(tx, user_id).await);
            }
            if chunks.peek().is_some() {
                tokio::time::sleep(CHUNK_PACING).await;
            }
        }
        results
    }
}
