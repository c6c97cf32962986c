use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use cardwise_core::{Category, CategoryMethod, CategoryResult, Transaction};

/// A per-user store keeps at most this many patterns, ranked by
/// confidence × hit count.
pub const MAX_PATTERNS_PER_USER: usize = 50;

/// Confidence bump applied when a known (category, pattern) pair is seen again.
const REINFORCEMENT: f32 = 0.05;

/// A regex learned from a previous high-confidence categorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub category: Category,
    /// Escaped merchant token, matched case-insensitively.
    pub pattern: String,
    pub confidence: f32,
    pub hits: u32,
}

impl LearnedPattern {
    fn rank(&self) -> f32 {
        self.confidence * self.hits as f32
    }
}

/// Per-user learned-pattern persistence. Keys are independent; the store does
/// not serialize same-key read-modify-write cycles — callers must not assume
/// atomicity across them.
pub trait UserPatternStore: Send + Sync {
    fn patterns(&self, user_id: &str) -> Vec<LearnedPattern>;
    /// Insert or reinforce a (category, pattern) pair, then prune.
    fn record(&self, user_id: &str, category: Category, pattern: &str);
    /// Replace a user's patterns wholesale (hydration from durable storage).
    fn replace(&self, user_id: &str, patterns: Vec<LearnedPattern>);
}

#[derive(Default)]
pub struct MemoryPatternStore {
    users: RwLock<HashMap<String, Vec<LearnedPattern>>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserPatternStore for MemoryPatternStore {
    fn patterns(&self, user_id: &str) -> Vec<LearnedPattern> {
        self.users
            .read()
            .ok()
            .and_then(|m| m.get(user_id).cloned())
            .unwrap_or_default()
    }

    fn record(&self, user_id: &str, category: Category, pattern: &str) {
        let Ok(mut users) = self.users.write() else {
            return;
        };
        let patterns = users.entry(user_id.to_string()).or_default();

        if let Some(existing) = patterns
            .iter_mut()
            .find(|p| p.category == category && p.pattern == pattern)
        {
            existing.confidence = (existing.confidence + REINFORCEMENT).min(1.0);
            existing.hits += 1;
        } else {
            patterns.push(LearnedPattern {
                category,
                pattern: pattern.to_string(),
                confidence: 0.8,
                hits: 1,
            });
        }

        prune(patterns);
    }

    fn replace(&self, user_id: &str, mut patterns: Vec<LearnedPattern>) {
        prune(&mut patterns);
        if let Ok(mut users) = self.users.write() {
            users.insert(user_id.to_string(), patterns);
        }
    }
}

/// Score-based eviction, not unbounded accumulation.
fn prune(patterns: &mut Vec<LearnedPattern>) {
    if patterns.len() <= MAX_PATTERNS_PER_USER {
        return;
    }
    patterns.sort_by(|a, b| {
        b.rank()
            .partial_cmp(&a.rank())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    patterns.truncate(MAX_PATTERNS_PER_USER);
}

/// Derive the stored pattern from a transaction's merchant token.
pub fn pattern_for(tx: &Transaction) -> Option<String> {
    let merchant = tx.merchant.trim().to_lowercase();
    if merchant.len() < 3 {
        return None;
    }
    Some(regex::escape(&merchant))
}

/// Match a user's learned patterns against a transaction.
pub fn match_patterns(patterns: &[LearnedPattern], tx: &Transaction) -> Option<CategoryResult> {
    let haystack = format!("{} {}", tx.description, tx.merchant).to_lowercase();
    patterns
        .iter()
        .filter_map(|p| {
            let re = regex::Regex::new(&p.pattern).ok()?;
            re.is_match(&haystack).then_some(p)
        })
        .max_by(|a, b| {
            a.rank()
                .partial_cmp(&b.rank())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| {
            CategoryResult::new(p.category, p.confidence, CategoryMethod::UserPattern)
                .with_details(format!("learned pattern '{}' ({} hits)", p.pattern, p.hits))
        })
}
