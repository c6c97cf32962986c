use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use cardwise_categorize::UserPatternStore;
use cardwise_core::{CardProfile, CategoryResult, Transaction};
use cardwise_optimize::{find_optimal_card, optimization_recommendations, CardComparison, Recommendation};
use cardwise_parse::{statement, ParsedStatement, ProcessingRecord, StatementKind, StatusStore};
use cardwise_rewards::{total_rewards, validate_card, validate_transactions, RewardOptions};

use crate::error::{ApiError, Result};
use crate::state::AppState;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ── Parse ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ParseQuery {
    pub kind: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
}

pub async fn parse_statement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParseQuery>,
    body: Bytes,
) -> Result<Json<ParsedStatement>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty file body".to_string()));
    }
    let kind = StatementKind::from_str(&query.kind)?;

    let parsed = match (&query.user, &query.file) {
        (Some(user), Some(file)) => {
            let result = state.parser.parse_tracked(user, file, &body, kind);
            if let Some(db) = &state.db {
                let key = statement::status_key(user, file);
                if let Some(record) = state.status.get(&key) {
                    cardwise_storage::set_processing_status(db, &key, &record).await?;
                }
            }
            result?
        }
        _ => state.parser.parse(&body, kind)?,
    };

    Ok(Json(parsed))
}

pub async fn statement_status(
    State(state): State<Arc<AppState>>,
    Path((user, file)): Path<(String, String)>,
) -> Result<Json<ProcessingRecord>> {
    if let Some(record) = state.parser.status(&user, &file) {
        return Ok(Json(record));
    }
    if let Some(db) = &state.db {
        let key = statement::status_key(&user, &file);
        if let Some(record) = cardwise_storage::get_processing_status(db, &key).await? {
            return Ok(Json(record));
        }
    }
    Err(ApiError::NotFound(format!("no processing record for {user}:{file}")))
}

// ── Categorize ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CategorizeRequest {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Feed high-confidence results back into the user's pattern store.
    #[serde(default = "default_true")]
    pub learn: bool,
}

fn default_true() -> bool {
    true
}

pub async fn categorize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CategorizeRequest>,
) -> Result<Json<Vec<CategoryResult>>> {
    validate_transactions(&request.transactions)?;

    // Hydrate the user's learned patterns from durable storage.
    if let (Some(db), Some(user_id)) = (&state.db, &request.user_id) {
        let patterns = cardwise_storage::load_user_patterns(db, user_id).await?;
        state.patterns.replace(user_id, patterns);
    }

    let results = state
        .categorizer
        .categorize_batch(&request.transactions, request.user_id.as_deref())
        .await;

    if request.learn {
        if let Some(user_id) = &request.user_id {
            for (tx, result) in request.transactions.iter().zip(&results) {
                state.categorizer.learn(user_id, tx, result);
            }
            if let Some(db) = &state.db {
                let patterns = state.patterns.patterns(user_id);
                cardwise_storage::save_user_patterns(db, user_id, &patterns).await?;
            }
        }
    }

    Ok(Json(results))
}

// ── Rewards ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RewardsRequest {
    pub transactions: Vec<Transaction>,
    pub card: CardProfile,
    #[serde(default)]
    pub options: RewardOptions,
}

pub async fn calculate_rewards(
    Json(request): Json<RewardsRequest>,
) -> Result<Json<cardwise_core::AggregateResult>> {
    validate_card(&request.card)?;
    validate_transactions(&request.transactions)?;
    Ok(Json(total_rewards(
        &request.transactions,
        &request.card,
        request.options,
    )))
}

// ── Compare / optimize ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub transactions: Vec<Transaction>,
    pub cards: Vec<CardProfile>,
}

pub async fn compare_cards(
    Json(request): Json<CompareRequest>,
) -> Result<Json<Vec<CardComparison>>> {
    if request.cards.is_empty() {
        return Err(ApiError::BadRequest("no candidate cards supplied".to_string()));
    }
    for card in &request.cards {
        validate_card(card)?;
    }
    validate_transactions(&request.transactions)?;
    Ok(Json(find_optimal_card(&request.transactions, &request.cards)))
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub transactions: Vec<Transaction>,
    pub current_card: CardProfile,
    #[serde(default)]
    pub alternative_cards: Vec<CardProfile>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub recommendations: Vec<Recommendation>,
}

pub async fn optimize(
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>> {
    validate_card(&request.current_card)?;
    for card in &request.alternative_cards {
        validate_card(card)?;
    }
    validate_transactions(&request.transactions)?;
    Ok(Json(OptimizeResponse {
        recommendations: optimization_recommendations(
            &request.transactions,
            &request.current_card,
            &request.alternative_cards,
        ),
    }))
}
