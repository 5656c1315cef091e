use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod movie;
pub mod rating;
pub mod user;

pub use movie::{Movie, NewMovie};
pub use rating::{average_score, Rating, RatingWrite};
pub use user::{NewUser, User};

/// Identifier of a user
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub i32);

/// Identifier of a movie
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct MovieId(pub i32);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_as_numbers() {
        assert_eq!(format!("{}", UserId(42)), "42");
        assert_eq!(format!("{}", MovieId(7)), "7");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&UserId(3)).unwrap(), "3");
        let id: MovieId = serde_json::from_str("11").unwrap();
        assert_eq!(id, MovieId(11));
    }

    #[test]
    fn test_movie_ids_order_numerically() {
        let mut ids = vec![MovieId(10), MovieId(2), MovieId(7)];
        ids.sort();
        assert_eq!(ids, vec![MovieId(2), MovieId(7), MovieId(10)]);
    }
}
