use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieId, NewMovie, UserId},
    routes::AppState,
    services::catalog::{self, MovieDetails},
};

#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    /// User viewing the page; enables their rating and a prediction
    pub user_id: Option<UserId>,
}

/// List all movies
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.store.list_movies().await?;
    Ok(Json(movies))
}

/// Create a movie
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }
    let movie = state.store.create_movie(request).await?;
    tracing::info!(movie_id = %movie.id, "Movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Show a movie, its ratings, and a prediction for the viewer if they have not rated it
pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<MovieId>,
    Query(viewer): Query<ViewerQuery>,
) -> AppResult<Json<MovieDetails>> {
    let details = catalog::movie_details(
        state.store.as_ref(),
        &state.recommender,
        movie_id,
        viewer.user_id,
    )
    .await?;
    Ok(Json(details))
}
