pub mod catalog;
pub mod correlation;
pub mod recommender;

pub use recommender::Recommender;
