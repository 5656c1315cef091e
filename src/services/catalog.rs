use std::ops::RangeInclusive;

use serde::Serialize;

use crate::{
    db::RatingStore,
    error::{AppError, AppResult},
    models::{average_score, Movie, MovieId, Rating, RatingWrite, User, UserId},
    services::recommender::Recommender,
};

/// A movie with its ratings, as seen by an optional viewing user
#[derive(Debug, Serialize)]
pub struct MovieDetails {
    pub movie: Movie,
    pub ratings: Vec<Rating>,
    /// Mean score, absent for an unrated movie
    pub average_score: Option<f64>,
    /// The viewer's own rating, if they rated this movie
    pub user_rating: Option<Rating>,
    /// Predicted score for a viewer who has not rated the movie yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
}

/// A user together with every rating they made
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub ratings: Vec<Rating>,
}

/// Loads a movie with its ratings and, for a viewer who has not rated it, a
/// predicted score
///
/// The prediction is only attempted for a viewer that exists and has no
/// rating for the movie; otherwise it is left absent.
pub async fn movie_details(
    store: &dyn RatingStore,
    recommender: &Recommender,
    movie_id: MovieId,
    viewer: Option<UserId>,
) -> AppResult<MovieDetails> {
    let movie = require_movie(store, movie_id).await?;

    let ratings = store.ratings_by_movie(movie_id).await?;
    let average_score = average_score(&ratings);

    let user_rating =
        viewer.and_then(|user_id| ratings.iter().find(|r| r.user_id == user_id).copied());

    let mut prediction = None;
    if let (Some(user_id), None) = (viewer, user_rating) {
        if store.get_user(user_id).await?.is_some() {
            prediction = recommender.predict_rating(user_id, movie_id).await?;
        } else {
            tracing::debug!(user_id = %user_id, "Viewer does not exist, skipping prediction");
        }
    }

    Ok(MovieDetails {
        movie,
        ratings,
        average_score,
        user_rating,
        prediction,
    })
}

/// Loads a user and their ratings
pub async fn user_profile(store: &dyn RatingStore, user_id: UserId) -> AppResult<UserProfile> {
    let user = require_user(store, user_id).await?;
    let ratings = store
        .ratings_by_user(user_id)
        .await?
        .into_values()
        .collect();
    Ok(UserProfile { user, ratings })
}

/// Records a rating, overwriting the user's previous score for the movie
///
/// # Errors
/// - `InvalidInput` when the score lies outside `accepted`
/// - `NotFound` when the user or the movie does not exist
pub async fn submit_rating(
    store: &dyn RatingStore,
    rating: Rating,
    accepted: RangeInclusive<i32>,
) -> AppResult<RatingWrite> {
    if !accepted.contains(&rating.score) {
        return Err(AppError::InvalidInput(format!(
            "score {} outside {}..={}",
            rating.score,
            accepted.start(),
            accepted.end()
        )));
    }

    require_user(store, rating.user_id).await?;
    require_movie(store, rating.movie_id).await?;

    let write = store.upsert_rating(rating).await?;

    tracing::info!(
        user_id = %rating.user_id,
        movie_id = %rating.movie_id,
        score = rating.score,
        outcome = ?write,
        "Rating stored"
    );

    Ok(write)
}

/// Fails with `NotFound` unless the user exists
pub async fn require_user(store: &dyn RatingStore, user_id: UserId) -> AppResult<User> {
    store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}

/// Fails with `NotFound` unless the movie exists
pub async fn require_movie(store: &dyn RatingStore, movie_id: MovieId) -> AppResult<Movie> {
    store
        .get_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("movie {}", movie_id)))
}
