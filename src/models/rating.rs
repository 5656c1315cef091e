use serde::{Deserialize, Serialize};

use super::{MovieId, UserId};

/// A user's score for a movie
///
/// At most one rating exists per (user, movie) pair; rating the same movie
/// again replaces the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: i32,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, score: i32) -> Self {
        Self {
            user_id,
            movie_id,
            score,
        }
    }
}

/// Outcome of storing a rating
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RatingWrite {
    /// No previous rating existed for the pair
    Created,
    /// An existing rating for the pair was overwritten
    Updated,
}

/// Mean score across ratings, or `None` when there are none
pub fn average_score(ratings: &[Rating]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let total: f64 = ratings.iter().map(|r| f64::from(r.score)).sum();
    Some(total / ratings.len() as f64)
}
