//! Table layout of the catalog.
//!
//! `average_rating` is stored in hundredths (367 = 3.67). `rating_total` is
//! the exact sum of every rating ever submitted and is what the average is
//! derived from.

use catalog::Result;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use tracing::info;

use crate::error::sql_error;
use crate::pool::StorePool;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movies (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT    NOT NULL,
    director        TEXT    NOT NULL,
    year            INTEGER,
    genre           TEXT,
    description     TEXT,
    poster_url      TEXT,
    average_rating  INTEGER NOT NULL DEFAULT 0 CHECK (average_rating BETWEEN 0 AND 500),
    num_ratings     INTEGER NOT NULL DEFAULT 0 CHECK (num_ratings >= 0),
    rating_total    INTEGER NOT NULL DEFAULT 0 CHECK (rating_total >= 0),
    UNIQUE (title, director)
);
CREATE INDEX IF NOT EXISTS idx_movies_year ON movies(year);
";

/// Register `fold_case(text)`, a Unicode-aware lowercase used by search.
///
/// SQLite's own `lower()` and `LIKE` only fold ASCII letters.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// Create the catalog tables if they don't exist yet. Idempotent.
pub async fn initialize(pool: &StorePool) -> Result<()> {
    pool.run(|conn| conn.execute_batch(SCHEMA).map_err(sql_error))
        .await?;
    info!("Catalog schema ready");
    Ok(())
}
