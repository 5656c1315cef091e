use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::{RatingSource, UserRatings},
    error::AppResult,
    models::{MovieId, Rating, UserId},
    services::correlation::{has_variance, pearson, CorrelationError},
};

/// Similarity of two users who have no rated movie in common
pub const NO_OVERLAP_SIMILARITY: f64 = 0.0;

/// One other user's vote towards a prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    /// Similarity between the voter and the target user
    pub similarity: f64,
    /// The voter's score for the movie being predicted
    pub score: i32,
}

/// Scores of movies rated by both users, as `(a's score, b's score)`.
///
/// Pairs come out in ascending movie order, so swapping the arguments yields
/// the same pairs mirrored.
pub fn paired_observations(a: &UserRatings, b: &UserRatings) -> Vec<(f64, f64)> {
    a.iter()
        .filter_map(|(movie_id, ours)| {
            b.get(movie_id)
                .map(|theirs| (f64::from(ours.score), f64::from(theirs.score)))
        })
        .collect()
}

/// Pearson similarity of two users over the movies both have rated.
///
/// Returns [`NO_OVERLAP_SIMILARITY`] when they share no movies and the
/// correlation's zero-variance value when either user's shared scores are all
/// equal. Symmetric in its arguments.
pub fn user_similarity(a: &UserRatings, b: &UserRatings) -> Result<f64, CorrelationError> {
    pairs_similarity(&paired_observations(a, b))
}

fn pairs_similarity(pairs: &[(f64, f64)]) -> Result<f64, CorrelationError> {
    if pairs.is_empty() {
        return Ok(NO_OVERLAP_SIMILARITY);
    }
    pearson(pairs)
}

/// Similarity-weighted mean of contributor scores.
///
/// Only contributors with positive similarity take part. Returns `None` when
/// none remain. The result is never rounded.
pub fn weighted_prediction(contributions: &[Contribution]) -> Option<f64> {
    let (weighted_sum, weight_total) = contributions
        .iter()
        .filter(|c| c.similarity > 0.0)
        .fold((0.0_f64, 0.0_f64), |(sum, total), c| {
            (sum + c.similarity * f64::from(c.score), total + c.similarity)
        });

    if weight_total > 0.0 {
        Some(weighted_sum / weight_total)
    } else {
        None
    }
}

/// User-based collaborative filtering over an injected rating source
///
/// Holds no state besides the source; every call recomputes from the ratings
/// the source returns at that moment.
#[derive(Clone)]
pub struct Recommender {
    source: Arc<dyn RatingSource>,
}

impl Recommender {
    pub fn new(source: Arc<dyn RatingSource>) -> Self {
        Self { source }
    }

    /// Similarity between two users, in `[-1.0, 1.0]`
    #[instrument(skip_all, fields(user_a = %user_a, user_b = %user_b))]
    pub async fn similarity(&self, user_a: UserId, user_b: UserId) -> AppResult<f64> {
        let ratings_a = self.source.ratings_by_user(user_a).await?;
        let ratings_b = self.source.ratings_by_user(user_b).await?;
        let pairs = paired_observations(&ratings_a, &ratings_b);
        let similarity = pairs_similarity(&pairs)?;

        tracing::debug!(
            similarity,
            overlap = pairs.len(),
            defined = has_variance(&pairs),
            "Computed user similarity"
        );

        Ok(similarity)
    }

    /// Predicts the score `target` would give `movie_id`.
    ///
    /// Every other user who rated the movie is weighted by their similarity to
    /// `target`; users with similarity `<= 0` are ignored. Returns `Ok(None)`
    /// when nobody positively correlated has rated the movie.
    ///
    /// If `target` already rated the movie the prediction is still computed
    /// from the other raters.
    #[instrument(skip_all, fields(target = %target, movie_id = %movie_id))]
    pub async fn predict_rating(
        &self,
        target: UserId,
        movie_id: MovieId,
    ) -> AppResult<Option<f64>> {
        let raters: Vec<Rating> = self
            .source
            .ratings_by_movie(movie_id)
            .await?
            .into_iter()
            .filter(|r| r.user_id != target)
            .collect();

        if raters.is_empty() {
            tracing::debug!("No other raters for movie");
            return Ok(None);
        }

        let target_ratings = self.source.ratings_by_user(target).await?;
        let rater_ratings = self
            .source
            .ratings_by_users(raters.iter().map(|r| r.user_id).collect())
            .await?;
        let unrated = UserRatings::new();

        let contributions = raters
            .iter()
            .map(|rating| {
                let theirs = rater_ratings.get(&rating.user_id).unwrap_or(&unrated);
                Ok(Contribution {
                    similarity: user_similarity(&target_ratings, theirs)?,
                    score: rating.score,
                })
            })
            .collect::<Result<Vec<_>, CorrelationError>>()?;

        let prediction = weighted_prediction(&contributions);

        tracing::debug!(
            raters = raters.len(),
            contributors = contributions.iter().filter(|c| c.similarity > 0.0).count(),
            prediction = ?prediction,
            "Predicted rating"
        );

        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::store::MockRatingSource, error::AppError};
    use std::collections::HashMap;

    const EPSILON: f64 = 1e-9;

    fn ratings(user: i32, scores: &[(i32, i32)]) -> UserRatings {
        scores
            .iter()
            .map(|&(movie, score)| {
                (
                    MovieId(movie),
                    Rating::new(UserId(user), MovieId(movie), score),
                )
            })
            .collect()
    }

    /// Mock source serving a fixed table of users and their ratings
    fn mock_source(table: Vec<UserRatings>) -> Arc<dyn RatingSource> {
        let by_user: HashMap<UserId, UserRatings> = table
            .into_iter()
            .filter_map(|r| {
                let user_id = r.values().next()?.user_id;
                Some((user_id, r))
            })
            .collect();
        let by_user_for_movies = by_user.clone();
        let by_user_for_batch = by_user.clone();

        let mut mock = MockRatingSource::new();
        mock.expect_ratings_by_user()
            .returning(move |user_id| Ok(by_user.get(&user_id).cloned().unwrap_or_default()));
        mock.expect_ratings_by_movie().returning(move |movie_id| {
            let mut raters: Vec<Rating> = by_user_for_movies
                .values()
                .filter_map(|r| r.get(&movie_id).copied())
                .collect();
            raters.sort_by_key(|r| r.user_id);
            Ok(raters)
        });
        mock.expect_ratings_by_users().returning(move |user_ids| {
            Ok(user_ids
                .into_iter()
                .filter_map(|id| Some((id, by_user_for_batch.get(&id)?.clone())))
                .collect())
        });
        Arc::new(mock)
    }

    fn worked_example() -> Vec<UserRatings> {
        vec![
            ratings(1, &[(1, 5), (2, 3), (3, 4)]),
            ratings(2, &[(1, 4), (2, 2), (3, 5), (4, 5)]),
            ratings(3, &[(1, 1), (2, 1), (3, 1), (4, 1)]),
        ]
    }

    #[test]
    fn test_paired_observations_only_common_movies() {
        let a = ratings(1, &[(1, 5), (2, 3), (7, 1)]);
        let b = ratings(2, &[(2, 4), (7, 2), (9, 5)]);
        assert_eq!(paired_observations(&a, &b), vec![(3.0, 4.0), (1.0, 2.0)]);
    }

    #[test]
    fn test_no_overlap_similarity_is_zero() {
        let a = ratings(1, &[(1, 5), (2, 3)]);
        let b = ratings(2, &[(3, 4), (4, 2)]);
        assert_eq!(user_similarity(&a, &b).unwrap(), NO_OVERLAP_SIMILARITY);
    }

    #[test]
    fn test_similarity_is_exactly_symmetric() {
        let a = ratings(1, &[(1, 5), (2, 3), (3, 4), (5, 1), (8, 2)]);
        let b = ratings(2, &[(1, 4), (2, 2), (3, 5), (5, 3), (6, 5)]);
        assert_eq!(
            user_similarity(&a, &b).unwrap(),
            user_similarity(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_weighted_prediction_without_contributors_is_absent() {
        assert_eq!(weighted_prediction(&[]), None);
        let non_positive = [
            Contribution {
                similarity: 0.0,
                score: 5,
            },
            Contribution {
                similarity: -0.8,
                score: 1,
            },
        ];
        assert_eq!(weighted_prediction(&non_positive), None);
    }

    #[test]
    fn test_weighted_prediction_keeps_fraction() {
        let contributions = [
            Contribution {
                similarity: 1.0,
                score: 5,
            },
            Contribution {
                similarity: 0.5,
                score: 4,
            },
            Contribution {
                similarity: -1.0,
                score: 1,
            },
        ];
        let prediction = weighted_prediction(&contributions).unwrap();
        assert!((prediction - 14.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_weighted_prediction_can_be_zero() {
        let contributions = [Contribution {
            similarity: 0.4,
            score: 0,
        }];
        assert_eq!(weighted_prediction(&contributions), Some(0.0));
    }

    #[tokio::test]
    async fn test_worked_example_similarities() {
        let recommender = Recommender::new(mock_source(worked_example()));

        let ab = recommender.similarity(UserId(1), UserId(2)).await.unwrap();
        let ac = recommender.similarity(UserId(1), UserId(3)).await.unwrap();

        assert!((ab - 6.0 / 84.0_f64.sqrt()).abs() < EPSILON);
        assert!(ab > 0.0);
        // C's scores are flat, so the coefficient is undefined
        assert_eq!(ac, 0.0);
    }

    #[tokio::test]
    async fn test_worked_example_prediction_follows_similar_user() {
        let recommender = Recommender::new(mock_source(worked_example()));

        let prediction = recommender
            .predict_rating(UserId(1), MovieId(4))
            .await
            .unwrap()
            .expect("B is positively correlated with A");

        // C contributes nothing, so the prediction is B's score
        assert!((prediction - 5.0).abs() < EPSILON);
    }

    #[tokio::test]
    async fn test_prediction_absent_without_raters() {
        let recommender = Recommender::new(mock_source(worked_example()));
        let prediction = recommender
            .predict_rating(UserId(1), MovieId(42))
            .await
            .unwrap();
        assert_eq!(prediction, None);
    }

    #[tokio::test]
    async fn test_prediction_absent_when_all_raters_dissimilar() {
        let table = vec![
            ratings(1, &[(1, 1), (2, 2), (3, 3)]),
            ratings(2, &[(1, 3), (2, 2), (3, 1), (9, 5)]),
            ratings(3, &[(5, 4), (9, 4)]),
        ];
        let recommender = Recommender::new(mock_source(table));
        let prediction = recommender
            .predict_rating(UserId(1), MovieId(9))
            .await
            .unwrap();
        assert_eq!(prediction, None);
    }

    #[tokio::test]
    async fn test_prediction_weights_by_similarity() {
        let table = vec![
            ratings(1, &[(1, 1), (2, 2), (3, 3)]),
            // similarity 1.0
            ratings(2, &[(1, 1), (2, 2), (3, 3), (9, 5)]),
            // similarity 0.5
            ratings(3, &[(1, 1), (2, 3), (3, 2), (9, 4)]),
            // similarity -1.0, ignored
            ratings(4, &[(1, 3), (2, 2), (3, 1), (9, 1)]),
        ];
        let recommender = Recommender::new(mock_source(table));
        let prediction = recommender
            .predict_rating(UserId(1), MovieId(9))
            .await
            .unwrap()
            .unwrap();
        assert!((prediction - 14.0 / 3.0).abs() < EPSILON);
    }

    #[tokio::test]
    async fn test_prediction_for_already_rated_movie_ignores_own_rating() {
        let table = vec![
            ratings(1, &[(1, 1), (2, 2), (3, 3), (9, 1)]),
            ratings(2, &[(1, 1), (2, 2), (3, 3), (9, 4)]),
        ];
        let recommender = Recommender::new(mock_source(table));
        let prediction = recommender
            .predict_rating(UserId(1), MovieId(9))
            .await
            .unwrap();
        assert_eq!(prediction, Some(4.0));
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let mut mock = MockRatingSource::new();
        mock.expect_ratings_by_movie()
            .returning(|movie_id| Ok(vec![Rating::new(UserId(2), movie_id, 4)]));
        mock.expect_ratings_by_user()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));
        let recommender = Recommender::new(Arc::new(mock));

        let result = recommender.predict_rating(UserId(1), MovieId(1)).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_rater_batch_error_propagates() {
        let mut mock = MockRatingSource::new();
        mock.expect_ratings_by_movie()
            .returning(|movie_id| Ok(vec![Rating::new(UserId(2), movie_id, 4)]));
        mock.expect_ratings_by_user()
            .returning(|user_id| Ok(ratings(user_id.0, &[(1, 3), (2, 5)])));
        mock.expect_ratings_by_users()
            .returning(|_| Err(AppError::Internal("pool timed out".to_string())));
        let recommender = Recommender::new(Arc::new(mock));

        let result = recommender.predict_rating(UserId(1), MovieId(1)).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_prediction_fetches_raters_in_one_batch() {
        let raters: Vec<UserId> = (2..=40).map(UserId).collect();

        let mut mock = MockRatingSource::new();
        let movie_raters = raters.clone();
        mock.expect_ratings_by_movie().times(1).returning(move |movie_id| {
            Ok(movie_raters
                .iter()
                .map(|&id| Rating::new(id, movie_id, 4))
                .collect())
        });
        mock.expect_ratings_by_user()
            .times(1)
            .returning(|user_id| Ok(ratings(user_id.0, &[(1, 1), (2, 2), (3, 3)])));
        let expected = raters.clone();
        mock.expect_ratings_by_users()
            .times(1)
            .withf(move |ids| *ids == expected)
            .returning(|ids| {
                Ok(ids
                    .into_iter()
                    .map(|id| (id, ratings(id.0, &[(1, 1), (2, 2), (3, 3), (9, 4)])))
                    .collect())
            });
        let recommender = Recommender::new(Arc::new(mock));

        let prediction = recommender
            .predict_rating(UserId(1), MovieId(9))
            .await
            .unwrap();
        assert_eq!(prediction, Some(4.0));
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let recommender = Recommender::new(mock_source(worked_example()));

        let first = recommender.predict_rating(UserId(1), MovieId(4)).await.unwrap();
        let second = recommender.predict_rating(UserId(1), MovieId(4)).await.unwrap();
        assert_eq!(first, second);

        let sim_first = recommender.similarity(UserId(2), UserId(3)).await.unwrap();
        let sim_second = recommender.similarity(UserId(2), UserId(3)).await.unwrap();
        assert_eq!(sim_first, sim_second);
    }
}
