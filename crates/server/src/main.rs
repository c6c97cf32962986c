use std::path::PathBuf;

use cardwise_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardwise=info,tower_http=info".into()),
        )
        .init();

    let addr = std::env::var("CARDWISE_ADDR").unwrap_or_else(|_| "127.0.0.1:8600".to_string());
    let classifier_url = std::env::var("CARDWISE_CLASSIFIER_URL").ok();

    let db = match std::env::var("CARDWISE_DB").ok() {
        Some(path) => {
            let path = PathBuf::from(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let pool = cardwise_storage::create_db(&path).await?;
            tracing::info!(db = %path.display(), "durable store attached");
            Some(pool)
        }
        None => {
            tracing::info!("no CARDWISE_DB set, stores are in-memory only");
            None
        }
    };

    if classifier_url.is_none() {
        tracing::info!("no CARDWISE_CLASSIFIER_URL set, classifier tier disabled");
    }

    let state = AppState::new(classifier_url, db);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "cardwise server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
