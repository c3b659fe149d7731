//! # Rating Aggregator
//!
//! Folds submitted ratings into each movie's running aggregate.
//!
//! Every submission is one read-modify-write inside a single
//! `BEGIN IMMEDIATE` transaction:
//! 1. take SQLite's write reservation and read `(average, count, total)`
//! 2. fold the new rating into the exact total
//! 3. write `(average, count, total)` back and commit
//!
//! The write reservation is taken before the read, so two concurrent
//! submitters can never both fold into the same stale aggregate. Any error
//! drops the transaction, which rolls it back.

use catalog::{AverageRating, CatalogError, MovieId, Rating, RatingAggregate, RatingOutcome, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::sql_error;
use crate::pool::StorePool;

/// The only writer of a movie's rating columns
#[derive(Clone)]
pub struct RatingAggregator {
    pool: StorePool,
}

impl RatingAggregator {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Fold `rating` into the aggregate of movie `id`.
    ///
    /// # Returns
    /// The new average and count, as committed
    ///
    /// # Errors
    /// * `NotFound` - no movie with this id; nothing is written
    /// * `StoreUnavailable` - no connection, or the transaction failed to commit
    pub async fn submit_rating(&self, id: MovieId, rating: Rating) -> Result<RatingOutcome> {
        let outcome = self
            .pool
            .run(move |conn| fold_rating(conn, id, rating))
            .await?;
        info!(
            "Movie {} rated {}: average {} over {} ratings",
            id,
            rating.value(),
            outcome.new_average,
            outcome.new_count
        );
        Ok(outcome)
    }

    /// Latest committed aggregate of movie `id`
    pub async fn aggregate(&self, id: MovieId) -> Result<RatingAggregate> {
        self.pool
            .run(move |conn| read_aggregate(conn, id).map_err(sql_error))
            .await?
            .ok_or(CatalogError::NotFound(id))
    }
}

fn fold_rating(conn: &mut Connection, id: MovieId, rating: Rating) -> Result<RatingOutcome> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(sql_error)?;

    let current = read_aggregate(&tx, id)
        .map_err(sql_error)?
        .ok_or(CatalogError::NotFound(id))?;
    let next = current.fold(rating);
    debug!(
        "Movie {}: ({}, {}) -> ({}, {})",
        id, current.average, current.count, next.average, next.count
    );

    tx.execute(
        "UPDATE movies SET average_rating = ?1, num_ratings = ?2, rating_total = ?3 WHERE id = ?4",
        params![next.average.hundredths(), next.count, total_to_sql(next.total)?, id],
    )
    .map_err(sql_error)?;
    tx.commit().map_err(sql_error)?;

    Ok(next.outcome())
}

fn read_aggregate(conn: &Connection, id: MovieId) -> rusqlite::Result<Option<RatingAggregate>> {
    conn.query_row(
        "SELECT average_rating, num_ratings, rating_total FROM movies WHERE id = ?1",
        [id],
        |row| {
            let total: i64 = row.get(2)?;
            Ok(RatingAggregate {
                average: AverageRating::from_hundredths(row.get(0)?),
                count: row.get(1)?,
                total: total.max(0) as u64,
            })
        },
    )
    .optional()
}

fn total_to_sql(total: u64) -> Result<i64> {
    i64::try_from(total)
        .map_err(|_| CatalogError::StoreUnavailable("rating total overflowed".to_string()))
}
