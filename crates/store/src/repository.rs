//! CRUD and search over the `movies` table.
//!
//! The repository never writes the rating columns; those belong to the
//! [`crate::RatingAggregator`].

use catalog::{AverageRating, CatalogError, Movie, MovieId, MovieUpdate, NewMovie, Result, SearchCriteria};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::error::sql_error;
use crate::pool::StorePool;

const MOVIE_COLUMNS: &str =
    "id, title, director, year, genre, description, poster_url, average_rating, num_ratings";

/// Catalog store backed by the connection pool
#[derive(Clone)]
pub struct MovieRepository {
    pool: StorePool,
}

impl MovieRepository {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// All movies, oldest first
    pub async fn list(&self) -> Result<Vec<Movie>> {
        let movies = self
            .pool
            .run(|conn| list_movies(conn).map_err(sql_error))
            .await?;
        debug!("Listed {} movies", movies.len());
        Ok(movies)
    }

    /// Movies matching every given criterion
    pub async fn search(&self, criteria: SearchCriteria) -> Result<Vec<Movie>> {
        if criteria.is_empty() {
            return Err(CatalogError::Validation(
                "At least one search parameter is required".to_string(),
            ));
        }
        let movies = self
            .pool
            .run(move |conn| search_movies(conn, &criteria).map_err(sql_error))
            .await?;
        debug!("Search matched {} movies", movies.len());
        Ok(movies)
    }

    pub async fn get(&self, id: MovieId) -> Result<Movie> {
        self.pool
            .run(move |conn| fetch_movie(conn, id).map_err(sql_error))
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Insert a movie with an empty rating aggregate and return it as stored
    pub async fn create(&self, movie: NewMovie) -> Result<Movie> {
        let created = self
            .pool
            .run(move |conn| insert_movie(conn, &movie).map_err(sql_error))
            .await?;
        info!("Created movie {} ({:?})", created.id, created.title);
        Ok(created)
    }

    /// Overwrite the provided fields and return the updated movie
    pub async fn update(&self, id: MovieId, update: MovieUpdate) -> Result<Movie> {
        if update.is_empty() {
            return Err(CatalogError::Validation(
                "No fields provided to update".to_string(),
            ));
        }
        let updated = self
            .pool
            .run(move |conn| update_movie(conn, id, &update).map_err(sql_error))
            .await?
            .ok_or(CatalogError::NotFound(id))?;
        info!("Updated movie {}", id);
        Ok(updated)
    }

    pub async fn delete(&self, id: MovieId) -> Result<()> {
        let removed = self
            .pool
            .run(move |conn| {
                conn.execute("DELETE FROM movies WHERE id = ?1", [id])
                    .map_err(sql_error)
            })
            .await?;
        if removed == 0 {
            return Err(CatalogError::NotFound(id));
        }
        info!("Deleted movie {}", id);
        Ok(())
    }
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        title: row.get(1)?,
        director: row.get(2)?,
        year: row.get(3)?,
        genre: row.get(4)?,
        description: row.get(5)?,
        poster_url: row.get(6)?,
        average_rating: AverageRating::from_hundredths(row.get(7)?),
        num_ratings: row.get(8)?,
    })
}

fn list_movies(conn: &Connection) -> rusqlite::Result<Vec<Movie>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id"))?;
    let movies = stmt
        .query_map([], movie_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(movies)
}

fn fetch_movie(conn: &Connection, id: MovieId) -> rusqlite::Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
        [id],
        movie_from_row,
    )
    .optional()
}

fn search_movies(conn: &Connection, criteria: &SearchCriteria) -> rusqlite::Result<Vec<Movie>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let text_criteria = [
        ("title", &criteria.title),
        ("director", &criteria.director),
        ("genre", &criteria.genre),
    ];
    for (column, needle) in text_criteria {
        if let Some(needle) = needle {
            clauses.push(format!("instr(fold_case({column}), ?) > 0"));
            values.push(Value::Text(needle.to_lowercase()));
        }
    }
    if let Some(year) = criteria.year {
        clauses.push("year = ?".to_string());
        values.push(Value::Integer(year));
    }

    let sql = format!(
        "SELECT {MOVIE_COLUMNS} FROM movies WHERE {} ORDER BY id",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let movies = stmt
        .query_map(params_from_iter(values.iter()), movie_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(movies)
}

fn insert_movie(conn: &mut Connection, movie: &NewMovie) -> rusqlite::Result<Movie> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO movies (title, director, year, genre, description, poster_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            movie.title,
            movie.director,
            movie.year,
            movie.genre,
            movie.description,
            movie.poster_url,
        ],
    )?;
    let id = tx.last_insert_rowid();
    let created = tx.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
        [id],
        movie_from_row,
    )?;
    tx.commit()?;
    Ok(created)
}

fn update_movie(
    conn: &mut Connection,
    id: MovieId,
    update: &MovieUpdate,
) -> rusqlite::Result<Option<Movie>> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(title) = &update.title {
        sets.push("title = ?");
        values.push(Value::Text(title.clone()));
    }
    if let Some(director) = &update.director {
        sets.push("director = ?");
        values.push(Value::Text(director.clone()));
    }
    if let Some(year) = update.year {
        sets.push("year = ?");
        values.push(Value::Integer(year as i64));
    }
    if let Some(genre) = &update.genre {
        sets.push("genre = ?");
        values.push(nullable_text(genre));
    }
    if let Some(description) = &update.description {
        sets.push("description = ?");
        values.push(nullable_text(description));
    }
    if let Some(poster_url) = &update.poster_url {
        sets.push("poster_url = ?");
        values.push(nullable_text(poster_url));
    }
    values.push(Value::Integer(id));

    let tx = conn.transaction()?;
    let changed = tx.execute(
        &format!("UPDATE movies SET {} WHERE id = ?", sets.join(", ")),
        params_from_iter(values.iter()),
    )?;
    if changed == 0 {
        return Ok(None);
    }
    let updated = fetch_movie(&tx, id)?;
    tx.commit()?;
    Ok(updated)
}

fn nullable_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}
