use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{ops::RangeInclusive, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    db::RatingStore,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::Recommender,
};

pub mod movies;
pub mod ratings;
pub mod users;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn RatingStore>,
    pub recommender: Recommender,
    /// Scores accepted by the rating endpoint
    pub score_range: RangeInclusive<i32>,
}

impl AppState {
    /// Wires the store into both the HTTP handlers and the recommender
    pub fn new<S: RatingStore + 'static>(store: Arc<S>, config: &Config) -> Self {
        Self {
            recommender: Recommender::new(store.clone()),
            store,
            score_range: config.min_score..=config.max_score,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/:movie_id", get(movies::show))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:user_id", get(users::show))
        .route("/users/:user_id/similarity/:other_id", get(users::similarity))
        .route("/users/:user_id/predictions/:movie_id", get(users::prediction))
        .route("/ratings", post(ratings::rate))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
