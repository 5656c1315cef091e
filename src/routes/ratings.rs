use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{MovieId, Rating, RatingWrite, UserId},
    routes::AppState,
    services::catalog,
};

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: i32,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub rating: Rating,
    /// Whether the rating was new or replaced an earlier score
    pub outcome: RatingWrite,
}

/// Handler for rating a movie; re-rating replaces the previous score
pub async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RateRequest>,
) -> AppResult<Json<RateResponse>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %request.user_id,
        movie_id = %request.movie_id,
        "Processing rating request"
    );

    let rating = Rating::new(request.user_id, request.movie_id, request.score);
    let outcome =
        catalog::submit_rating(state.store.as_ref(), rating, state.score_range.clone()).await?;

    Ok(Json(RateResponse { rating, outcome }))
}
