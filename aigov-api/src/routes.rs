use aigov_app::domain::{Block, Insight, UserProfile};
use aigov_app::infrastructure::security::{ErrorClassifier, RateLimitResult};
use aigov_app::AppContext;
use aigov_errors::AIError;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/api/insights", post(generate_insight))
        .route("/api/reflections/summary", post(summarize_reflection))
        .route("/api/limits/{operation}/{identifier}", get(limit_status))
        .with_state(ctx)
}

#[derive(Deserialize)]
struct InsightRequest {
    identifier: String,
    profile: UserProfile,
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Serialize)]
struct InsightResponse {
    insight: Insight,
}

#[derive(Deserialize)]
struct ReflectionRequest {
    identifier: String,
    #[serde(default)]
    reflection: Value,
}

#[derive(Serialize)]
struct ReflectionResponse {
    summary: String,
}

async fn generate_insight(
    State(ctx): State<AppContext>,
    Json(req): Json<InsightRequest>,
) -> Result<Json<InsightResponse>, AIError> {
    let insight = ctx
        .generate_insight
        .execute(&req.identifier, &req.profile, &req.blocks)
        .await?;
    Ok(Json(InsightResponse { insight }))
}

async fn summarize_reflection(
    State(ctx): State<AppContext>,
    Json(req): Json<ReflectionRequest>,
) -> Result<Json<ReflectionResponse>, AIError> {
    let summary = ctx
        .summarize_reflection
        .execute(&req.identifier, &req.reflection)
        .await?;
    Ok(Json(ReflectionResponse { summary }))
}

async fn limit_status(
    State(ctx): State<AppContext>,
    Path((operation, identifier)): Path<(String, String)>,
) -> Result<Json<RateLimitResult>, AIError> {
    ctx.rate_limiter
        .get_status(&identifier, &operation)
        .await
        .map(Json)
        .map_err(|e| ErrorClassifier::classify(&e, &operation, Some(identifier.as_str())))
}
