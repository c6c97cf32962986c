use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use cardwise_core::{Category, Money};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier request failed: {0}")]
    Transport(String),
    #[error("Classifier returned malformed response: {0}")]
    Malformed(String),
}

/// An external natural-language classifier's opinion on a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub category: Category,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

/// The external classifier collaborator. Treated as unreliable
/// infrastructure: callers swallow every error and fall through.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, description: &str, amount: Money)
        -> Result<ClassifierVerdict, ClassifierError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    description: &'a str,
    amount: Money,
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    category: String,
    confidence: f32,
    #[serde(default)]
    reasoning: String,
}

/// Posts the description and amount plus the fixed category enumeration to a
/// hosted classifier endpoint. No internal timeout — that sits with the
/// caller's transport configuration.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        description: &str,
        amount: Money,
    ) -> Result<ClassifierVerdict, ClassifierError> {
        let request = ClassifyRequest {
            description,
            amount,
            categories: Category::ALL.iter().map(|c| c.to_string()).collect(),
        };

        let response: ClassifyResponse = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| ClassifierError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let category = Category::from_str(&response.category)
            .map_err(ClassifierError::Malformed)?;

        Ok(ClassifierVerdict {
            category,
            confidence: response.confidence.clamp(0.0, 1.0),
            reasoning: response.reasoning,
        })
    }
}

// ── Mock implementation (tests) ──────────────────────────────────────────────

/// Returns a preset verdict or error — lets tests drive the fallback chain
/// without a network.
pub struct MockClassifier {
    verdict: Option<ClassifierVerdict>,
}

impl MockClassifier {
    pub fn returning(verdict: ClassifierVerdict) -> Self {
        Self {
            verdict: Some(verdict),
        }
    }

    pub fn failing() -> Self {
        Self { verdict: None }
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(
        &self,
        _description: &str,
        _amount: Money,
    ) -> Result<ClassifierVerdict, ClassifierError> {
        self.verdict
            .clone()
            .ok_or_else(|| ClassifierError::Transport("mock outage".to_string()))
    }
}
