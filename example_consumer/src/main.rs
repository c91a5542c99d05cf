//! Example consumer: a host application mounting model-rest routes.
//!
//! Run from repo root: `MODELS_PATH=models.json cargo run -p example-consumer`
//! Set `DATABASE_URL` to persist in PostgreSQL; otherwise documents live in memory.

use model_rest::{
    common_routes_with_docs, ensure_database_exists, load_catalog, DocumentStore, MemoryStore,
    PgDocumentStore, RestApi, RestSettings, DEFAULT_API_ROOT,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_rest=info")),
        )
        .init();

    let models_path = std::env::var("MODELS_PATH").unwrap_or_else(|_| "models.json".into());
    let catalog = Arc::new(load_catalog(&models_path).await?);

    let store: Arc<dyn DocumentStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            ensure_database_exists(&database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            let store = PgDocumentStore::new(pool, "public");
            store.ensure_collections(&catalog).await?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let settings = RestSettings {
        api_root: std::env::var("API_ROOT").unwrap_or_else(|_| DEFAULT_API_ROOT.into()),
        ..Default::default()
    };
    let (api, report) = RestApi::create_rest(catalog, store, settings);
    for (model, result) in &report {
        if let Err(e) = result {
            tracing::warn!(model = %model, error = %e, "model not served");
        }
    }

    // outside the api root
    let app = common_routes_with_docs("/docs", api.api_docs()).merge(api.router());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
