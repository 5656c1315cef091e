use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{MovieId, NewUser, User, UserId},
    routes::AppState,
    services::catalog::{self, UserProfile},
};

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub user_id: UserId,
    pub other_id: UserId,
    pub similarity: f64,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// `null` when no positively correlated user rated the movie
    pub prediction: Option<f64>,
}

/// List all users
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<User>>> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

/// Register a user
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.store.create_user(request).await?;
    tracing::info!(user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Show a user and the movies they rated
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<UserProfile>> {
    let profile = catalog::user_profile(state.store.as_ref(), user_id).await?;
    Ok(Json(profile))
}

/// Similarity between two users
pub async fn similarity(
    State(state): State<Arc<AppState>>,
    Path((user_id, other_id)): Path<(UserId, UserId)>,
) -> AppResult<Json<SimilarityResponse>> {
    catalog::require_user(state.store.as_ref(), user_id).await?;
    catalog::require_user(state.store.as_ref(), other_id).await?;

    let similarity = state.recommender.similarity(user_id, other_id).await?;

    Ok(Json(SimilarityResponse {
        user_id,
        other_id,
        similarity,
    }))
}

/// Predicted score of a user for a movie
pub async fn prediction(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(UserId, MovieId)>,
) -> AppResult<Json<PredictionResponse>> {
    catalog::require_user(state.store.as_ref(), user_id).await?;
    catalog::require_movie(state.store.as_ref(), movie_id).await?;

    let prediction = state.recommender.predict_rating(user_id, movie_id).await?;

    Ok(Json(PredictionResponse {
        user_id,
        movie_id,
        prediction,
    }))
}
