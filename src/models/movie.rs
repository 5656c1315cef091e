use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::MovieId;

/// A movie that users can rate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    /// Unique identifier for the movie
    pub id: MovieId,
    /// Display title
    pub title: String,
    /// Theatrical release date, if known
    pub released_at: Option<NaiveDate>,
    /// Link to the IMDb page, if known
    pub imdb_url: Option<String>,
}

/// Fields supplied when creating a movie
#[derive(Debug, Clone, Deserialize)]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub released_at: Option<NaiveDate>,
    #[serde(default)]
    pub imdb_url: Option<String>,
}

impl NewMovie {
    /// Creates a movie payload with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            released_at: None,
            imdb_url: None,
        }
    }

    /// Assigns an id, producing the stored movie
    pub fn into_movie(self, id: MovieId) -> Movie {
        Movie {
            id,
            title: self.title,
            released_at: self.released_at,
            imdb_url: self.imdb_url,
        }
    }
}
