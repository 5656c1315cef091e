use std::collections::HashMap;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::store::{group_by_user, RatingSource, RatingStore, UserRatings},
    error::AppResult,
    models::{Movie, MovieId, NewMovie, NewUser, Rating, RatingWrite, User, UserId},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema migrations bundled in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Rating store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingSource for PgStore {
    async fn get_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, age, zipcode FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn ratings_by_user(&self, user_id: UserId) -> AppResult<UserRatings> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT user_id, movie_id, score FROM ratings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings.into_iter().map(|r| (r.movie_id, r)).collect())
    }

    async fn ratings_by_movie(&self, movie_id: MovieId) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT user_id, movie_id, score FROM ratings WHERE movie_id = $1 ORDER BY user_id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    async fn ratings_by_users(
        &self,
        user_ids: Vec<UserId>,
    ) -> AppResult<HashMap<UserId, UserRatings>> {
        let ids: Vec<i32> = user_ids.iter().map(|id| id.0).collect();
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT user_id, movie_id, score FROM ratings WHERE user_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(group_by_user(ratings))
    }
}

#[async_trait::async_trait]
impl RatingStore for PgStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, email, age, zipcode FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, age, zipcode) VALUES ($1, $2, $3) \
             RETURNING id, email, age, zipcode",
        )
        .bind(new_user.email)
        .bind(new_user.age)
        .bind(new_user.zipcode)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, released_at, imdb_url FROM movies ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn get_movie(&self, movie_id: MovieId) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, released_at, imdb_url FROM movies WHERE id = $1",
        )
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn create_movie(&self, new_movie: NewMovie) -> AppResult<Movie> {
        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movies (title, released_at, imdb_url) VALUES ($1, $2, $3) \
             RETURNING id, title, released_at, imdb_url",
        )
        .bind(new_movie.title)
        .bind(new_movie.released_at)
        .bind(new_movie.imdb_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn get_rating(&self, user_id: UserId, movie_id: MovieId) -> AppResult<Option<Rating>> {
        let rating = sqlx::query_as::<_, Rating>(
            "SELECT user_id, movie_id, score FROM ratings WHERE user_id = $1 AND movie_id = $2",
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rating)
    }

    async fn upsert_rating(&self, rating: Rating) -> AppResult<RatingWrite> {
        // xmax is zero only for a freshly inserted row version
        let inserted: bool = sqlx::query_scalar(
            "INSERT INTO ratings (user_id, movie_id, score) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, movie_id) DO UPDATE SET score = EXCLUDED.score \
             RETURNING (xmax = 0)",
        )
        .bind(rating.user_id)
        .bind(rating.movie_id)
        .bind(rating.score)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            RatingWrite::Created
        } else {
            RatingWrite::Updated
        })
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
