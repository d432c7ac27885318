mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::refine::Refine;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Initialize the refine client (non-fatal: refine disabled if unset).
    let refiner: Option<Arc<dyn services::refine::Refine>> =
        match services::refine::HttpRefiner::from_env() {
            Ok(client) => {
                tracing::info!(model = client.model(), "refine client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "refine client not configured — card:refine disabled");
                None
            }
        };

    let state = state::AppState::new(pool, refiner);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "ideaboard gateway listening");
    axum::serve(listener, app).await.expect("server failed");
}
