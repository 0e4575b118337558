mod routes;

use aigov_app::AppContext;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let app_context = AppContext::from_env().expect("Failed to load AI governance configuration");
    let _sweeper = app_context.start_background_tasks();

    let config = app_context.config();
    tracing::info!(
        "Rate limiting: {} (profile {:?}), max attempts per call: {}",
        if config.rate_limit_enabled { "enabled" } else { "disabled" },
        config.profile,
        config.max_attempts
    );

    let app = routes::router(app_context)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
