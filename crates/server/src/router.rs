use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

/// Uploaded statements are capped at 20 MiB.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/statements/parse", post(handlers::parse_statement))
        .route(
            "/api/statements/{user}/{file}/status",
            get(handlers::statement_status),
        )
        .route("/api/categorize", post(handlers::categorize))
        .route("/api/rewards", post(handlers::calculate_rewards))
        .route("/api/cards/compare", post(handlers::compare_cards))
        .route("/api/cards/optimize", post(handlers::optimize))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(None, None))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn parse_csv_round_trip() {
        let csv = "Date,Merchant,Amount\n10/08/2025,Zomato Order,540\n";
        let response = app()
            .oneshot(
                Request::post("/api/statements/parse?kind=csv")
                    .body(Body::from(csv))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["transactions"].as_array().unwrap().len(), 1);
        assert_eq!(json["transactions"][0]["merchant"], "Zomato Order");
        assert_eq!(json["summary"]["transaction_count"], 1);
    }

    #[tokio::test]
    async fn parse_rejects_unknown_kind() {
        let response = app()
            .oneshot(
                Request::post("/api/statements/parse?kind=docx")
                    .body(Body::from("x".repeat(32)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn parse_missing_column_is_bad_request() {
        let csv = "Date,Merchant\n10/08/2025,Zomato\n";
        let response = app()
            .oneshot(
                Request::post("/api/statements/parse?kind=csv")
                    .body(Body::from(csv))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("amount"));
    }

    #[tokio::test]
    async fn status_endpoint_tracks_parse() {
        let app = app();
        let csv = "Date,Merchant,Amount\n10/08/2025,Zomato Order,540\n";
        let _ = app
            .clone()
            .oneshot(
                Request::post("/api/statements/parse?kind=csv&user=u1&file=f1")
                    .body(Body::from(csv))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::get("/api/statements/u1/f1/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "completed");
    }

    #[tokio::test]
    async fn status_unknown_is_not_found() {
        let response = app()
            .oneshot(
                Request::get("/api/statements/ghost/f0/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn categorize_preserves_order() {
        let body = serde_json::json!({
            "transactions": [
                {"id": "a", "date": "2025-08-10", "description": "Zomato Order",
                 "amount": "540", "merchant": "Zomato Order"},
                {"id": "b", "date": "2025-08-11", "description": "XQZV 9911",
                 "amount": "100", "merchant": "XQZV"}
            ],
            "learn": false
        });
        let response = app()
            .oneshot(
                Request::post("/api/categorize")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let results = json.as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["category"], "food");
        assert_eq!(results[1]["category"], "others");
    }

    #[tokio::test]
    async fn rewards_scenario_b() {
        let body = serde_json::json!({
            "transactions": [
                {"id": "a", "date": "2025-08-10", "description": "Zomato Order",
                 "amount": "540", "merchant": "Zomato Order", "category": "food"}
            ],
            "card": {"id": "c1", "name": "Food Card", "category_rates": {"food": "5"}}
        });
        let response = app()
            .oneshot(
                Request::post("/api/rewards")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let reward: f64 = json["total_reward"].as_str().unwrap().parse().unwrap();
        assert_eq!(reward, 27.0);
        assert_eq!(json["capped_count"], 0);
    }

    #[tokio::test]
    async fn compare_requires_candidates() {
        let body = serde_json::json!({ "transactions": [], "cards": [] });
        let response = app()
            .oneshot(
                Request::post("/api/cards/compare")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rewards_rejects_invalid_card() {
        let body = serde_json::json!({
            "transactions": [],
            "card": {"id": "bad", "name": "Bad", "category_rates": {"food": "-1"}}
        });
        let response = app()
            .oneshot(
                Request::post("/api/rewards")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
