pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use store::{RatingSource, RatingStore, UserRatings};
