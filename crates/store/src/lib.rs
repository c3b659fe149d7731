//! # Store Crate
//!
//! SQLite persistence for the movie catalog.
//!
//! ## Components
//!
//! - **pool**: Bounded pool of reusable connections; every operation runs
//!   on the blocking thread pool behind a semaphore permit
//! - **schema**: Idempotent creation of the `movies` table
//! - **repository**: `MovieRepository`, the CRUD and search operations
//! - **aggregator**: `RatingAggregator`, the transactional rating fold
//!
//! ## Example Usage
//!
//! ```ignore
//! use store::{MovieRepository, RatingAggregator, StoreConfig, StorePool};
//!
//! let pool = StorePool::connect(StoreConfig::new("catalog.db")).await?;
//! store::schema::initialize(&pool).await?;
//!
//! let movies = MovieRepository::new(pool.clone());
//! let ratings = RatingAggregator::new(pool);
//!
//! let movie = movies.create(new_movie).await?;
//! let outcome = ratings.submit_rating(movie.id, Rating::try_from(4)?).await?;
//! ```

mod error;

pub mod aggregator;
pub mod pool;
pub mod repository;
pub mod schema;

pub use aggregator::RatingAggregator;
pub use pool::{PoolStatus, StoreConfig, StorePool};
pub use repository::MovieRepository;

/// Open the pool (retrying with a fixed backoff) and make sure the schema
/// exists.
pub async fn open(
    config: StoreConfig,
    attempts: u32,
    backoff: std::time::Duration,
) -> catalog::Result<StorePool> {
    let pool = StorePool::connect_with_retry(config, attempts, backoff).await?;
    schema::initialize(&pool).await?;
    Ok(pool)
}
