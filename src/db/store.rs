use std::collections::{BTreeMap, HashMap};

use crate::{
    error::AppResult,
    models::{Movie, MovieId, NewMovie, NewUser, Rating, RatingWrite, User, UserId},
};

/// A user's ratings keyed by movie, in ascending movie order
pub type UserRatings = BTreeMap<MovieId, Rating>;

/// Groups ratings by the user who made them
pub fn group_by_user(ratings: impl IntoIterator<Item = Rating>) -> HashMap<UserId, UserRatings> {
    ratings.into_iter().fold(HashMap::new(), |mut grouped, rating| {
        grouped
            .entry(rating.user_id)
            .or_insert_with(UserRatings::new)
            .insert(rating.movie_id, rating);
        grouped
    })
}

/// Read-only view of rating data consumed by the recommender
///
/// Implementations hand out owned snapshots; the recommender never holds a
/// connection or lock across calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    /// Looks up a user by id
    async fn get_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// All ratings made by a user. Unknown users have no ratings.
    async fn ratings_by_user(&self, user_id: UserId) -> AppResult<UserRatings>;

    /// All ratings recorded for a movie, one per rating user
    async fn ratings_by_movie(&self, movie_id: MovieId) -> AppResult<Vec<Rating>>;

    /// Ratings of several users in one round trip. Users without ratings are
    /// absent from the map.
    async fn ratings_by_users(
        &self,
        user_ids: Vec<UserId>,
    ) -> AppResult<HashMap<UserId, UserRatings>>;
}

/// Full persistence contract used by the HTTP layer
#[async_trait::async_trait]
pub trait RatingStore: RatingSource {
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    async fn get_movie(&self, movie_id: MovieId) -> AppResult<Option<Movie>>;

    async fn create_movie(&self, new_movie: NewMovie) -> AppResult<Movie>;

    /// The rating a user gave a movie, if any
    async fn get_rating(&self, user_id: UserId, movie_id: MovieId) -> AppResult<Option<Rating>>;

    /// Stores a rating, replacing any existing score for the same user and movie
    async fn upsert_rating(&self, rating: Rating) -> AppResult<RatingWrite>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
