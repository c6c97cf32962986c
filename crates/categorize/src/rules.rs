use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

use cardwise_core::{Category, CategoryMethod, CategoryResult, Transaction};

const KEYWORD_WEIGHT: f32 = 1.0;
const PATTERN_WEIGHT: f32 = 1.5;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rule TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Unknown category in rule table: {0}")]
    UnknownCategory(String),
    #[error("Invalid pattern for {category}: {pattern}")]
    InvalidPattern { category: String, pattern: String },
}

#[derive(Debug, Deserialize)]
struct RuleTable {
    #[serde(rename = "category")]
    categories: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    name: String,
    priority: u32,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
}

struct CompiledRule {
    category: Category,
    priority: u32,
    keywords: Vec<String>,
    patterns: Vec<regex::Regex>,
}

/// The rule-based categorization tier. Each category owns a keyword list and
/// a pattern set with an integer priority; the highest normalized score that
/// clears the caller's threshold wins.
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// The curated default table shipped with the crate.
    pub fn with_defaults() -> Self {
        Self::from_toml(include_str!("default_rules.toml"))
            .expect("embedded rule table must parse")
    }

    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        let table: RuleTable = toml::from_str(content)?;
        let mut rules = Vec::with_capacity(table.categories.len());
        for entry in table.categories {
            let category = Category::from_str(&entry.name)
                .map_err(|_| RuleError::UnknownCategory(entry.name.clone()))?;
            let mut patterns = Vec::with_capacity(entry.patterns.len());
            for p in &entry.patterns {
                let re = regex::Regex::new(p).map_err(|_| RuleError::InvalidPattern {
                    category: entry.name.clone(),
                    pattern: p.clone(),
                })?;
                patterns.push(re);
            }
            rules.push(CompiledRule {
                category,
                priority: entry.priority.max(1),
                keywords: entry.keywords.iter().map(|k| k.to_lowercase()).collect(),
                patterns,
            });
        }
        Ok(RuleEngine { rules })
    }

    /// Score every category against the transaction and return the best,
    /// or `None` when no keyword or pattern matched at all.
    pub fn evaluate(&self, tx: &Transaction) -> Option<CategoryResult> {
        let text = format!("{} {}", tx.description, tx.merchant).to_lowercase();

        let mut best: Option<(Category, f32, usize)> = None;
        for rule in &self.rules {
            let keyword_hits = rule.keywords.iter().filter(|k| text.contains(k.as_str())).count();
            let pattern_hits = rule
                .patterns
                .iter()
                .filter(|re| re.is_match(&tx.description) || re.is_match(&tx.merchant))
                .count();
            let hits = keyword_hits + pattern_hits;
            if hits == 0 {
                continue;
            }
            let raw = (keyword_hits as f32 * KEYWORD_WEIGHT + pattern_hits as f32 * PATTERN_WEIGHT)
                / rule.priority as f32;
            let score = normalize(raw);
            if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
                best = Some((rule.category, score, hits));
            }
        }

        best.map(|(category, score, hits)| {
            CategoryResult::new(category, score, CategoryMethod::Rule)
                .with_details(format!("{hits} rule hit(s)"))
        })
    }
}

/// Squash a raw weighted-hit score into [0, 1]. One keyword hit at priority 1
/// lands exactly on the 0.7 confidence threshold; extra evidence saturates
/// toward 1.0.
fn normalize(raw: f32) -> f32 {
    (1.4 * raw / (raw + 1.0)).min(1.0)
}
