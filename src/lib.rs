//! Movie ratings service with user-based collaborative filtering.
//!
//! [`services::correlation`] computes Pearson correlation over paired scores,
//! [`services::recommender`] turns it into user similarity and rating
//! predictions, and the remaining modules wire those into a JSON API over a
//! pluggable rating store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
