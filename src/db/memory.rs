use std::collections::{BTreeMap, HashMap, HashSet};

use tokio::sync::RwLock;

use crate::{
    db::store::{group_by_user, RatingSource, RatingStore, UserRatings},
    error::AppResult,
    models::{Movie, MovieId, NewMovie, NewUser, Rating, RatingWrite, User, UserId},
};

/// Rating store kept entirely in process memory
///
/// Backs `STORE=memory` and the test suites. Ids are assigned sequentially
/// starting at 1, like a `SERIAL` column.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<InMemoryStoreInner>,
}

#[derive(Default)]
struct InMemoryStoreInner {
    users: BTreeMap<UserId, User>,
    movies: BTreeMap<MovieId, Movie>,
    ratings: HashMap<(UserId, MovieId), Rating>,
    next_user_id: i32,
    next_movie_id: i32,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user, then records `scores` as `(movie, score)` ratings for it.
    ///
    /// Movies referenced by `scores` are created on demand with placeholder
    /// titles. Intended for seeding fixtures.
    pub async fn seed_user(&self, scores: &[(i32, i32)]) -> User {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let user = inner.insert_user(NewUser::default());
        for &(movie, score) in scores {
            let movie_id = MovieId(movie);
            if !inner.movies.contains_key(&movie_id) {
                inner.movies.insert(
                    movie_id,
                    NewMovie::titled(format!("Movie {}", movie)).into_movie(movie_id),
                );
                inner.next_movie_id = inner.next_movie_id.max(movie);
            }
            inner
                .ratings
                .insert((user.id, movie_id), Rating::new(user.id, movie_id, score));
        }
        user
    }
}

impl InMemoryStoreInner {
    fn insert_user(&mut self, new_user: NewUser) -> User {
        self.next_user_id += 1;
        let user = new_user.into_user(UserId(self.next_user_id));
        self.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait::async_trait]
impl RatingSource for InMemoryStore {
    async fn get_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn ratings_by_user(&self, user_id: UserId) -> AppResult<UserRatings> {
        let inner = self.inner.read().await;
        Ok(inner
            .ratings
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| (r.movie_id, *r))
            .collect())
    }

    async fn ratings_by_movie(&self, movie_id: MovieId) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<Rating> = inner
            .ratings
            .values()
            .filter(|r| r.movie_id == movie_id)
            .copied()
            .collect();
        ratings.sort_by_key(|r| r.user_id);
        Ok(ratings)
    }

    async fn ratings_by_users(
        &self,
        user_ids: Vec<UserId>,
    ) -> AppResult<HashMap<UserId, UserRatings>> {
        let wanted: HashSet<UserId> = user_ids.into_iter().collect();
        let inner = self.inner.read().await;
        Ok(group_by_user(
            inner
                .ratings
                .values()
                .filter(|r| wanted.contains(&r.user_id))
                .copied(),
        ))
    }
}

#[async_trait::async_trait]
impl RatingStore for InMemoryStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        Ok(self.inner.write().await.insert_user(new_user))
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        Ok(self.inner.read().await.movies.values().cloned().collect())
    }

    async fn get_movie(&self, movie_id: MovieId) -> AppResult<Option<Movie>> {
        Ok(self.inner.read().await.movies.get(&movie_id).cloned())
    }

    async fn create_movie(&self, new_movie: NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;
        inner.next_movie_id += 1;
        let movie = new_movie.into_movie(MovieId(inner.next_movie_id));
        inner.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn get_rating(&self, user_id: UserId, movie_id: MovieId) -> AppResult<Option<Rating>> {
        Ok(self
            .inner
            .read()
            .await
            .ratings
            .get(&(user_id, movie_id))
            .copied())
    }

    async fn upsert_rating(&self, rating: Rating) -> AppResult<RatingWrite> {
        let mut inner = self.inner.write().await;
        let previous = inner
            .ratings
            .insert((rating.user_id, rating.movie_id), rating);
        Ok(match previous {
            Some(_) => RatingWrite::Updated,
            None => RatingWrite::Created,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
