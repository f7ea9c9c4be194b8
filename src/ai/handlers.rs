use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use tracing::{instrument, warn};

use super::dto::ProcessRequest;
use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn ai_routes() -> Router<AppState> {
    Router::new().route("/ai/process", post(process))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn process(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(payload) = payload?;
    if payload.input.trim().is_empty() {
        return Err(ApiError::validation("Input must not be empty"));
    }

    let client = state
        .ai
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("AI service is not configured"))?;

    match client.run(&payload.input).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            warn!(error = ?e, "AI workflow call failed");
            Err(ApiError::upstream("AI service request failed"))
        }
    }
}
