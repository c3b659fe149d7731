//! Validation of raw request payloads.
//!
//! Turns loosely-typed input (JSON bodies, query strings, path segments) into
//! the validated types from [`crate::types`]:
//! - `MovieFields` -> `NewMovie` on create, `MovieUpdate` on update
//! - `SearchQuery` -> `SearchCriteria`
//! - path segments -> `MovieId`

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::types::*;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DIRECTOR_LEN: usize = 255;
pub const MAX_GENRE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_POSTER_URL_LEN: usize = 2048;

/// First year a movie can plausibly be from
pub const MIN_YEAR: i64 = 1888;
pub const MAX_YEAR: i64 = 2100;

static POSTER_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://\S+\.(jpg|jpeg|png|gif|bmp|webp)$")
        .expect("poster url pattern is valid")
});

/// Movie fields as they arrive in a create or update body.
///
/// Every field is optional here; which ones are required depends on whether
/// the payload is validated as a create or an update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFields {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
}

/// Query string of a search request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
}

/// Parse a movie id taken from a URL path
pub fn parse_movie_id(raw: &str) -> Result<MovieId> {
    match raw.trim().parse::<MovieId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CatalogError::validation(format!("Invalid movie id: {}", raw))),
    }
}

/// Validate a create payload. Title and director are required.
pub fn validate_new(fields: MovieFields) -> Result<NewMovie> {
    let title = fields
        .title
        .ok_or_else(|| CatalogError::validation("Title is required"))?;
    let director = fields
        .director
        .ok_or_else(|| CatalogError::validation("Director is required"))?;

    Ok(NewMovie {
        title: required_text("Title", &title, MAX_TITLE_LEN)?,
        director: required_text("Director", &director, MAX_DIRECTOR_LEN)?,
        year: fields.year.map(validate_year).transpose()?,
        genre: optional_text("Genre", fields.genre, MAX_GENRE_LEN)?,
        description: optional_text("Description", fields.description, MAX_DESCRIPTION_LEN)?,
        poster_url: fields.poster_url.map(validate_poster_url).transpose()?.flatten(),
    })
}

/// Validate an update payload. Only provided fields are checked, and at
/// least one must be present.
pub fn validate_update(fields: MovieFields) -> Result<MovieUpdate> {
    let update = MovieUpdate {
        title: fields
            .title
            .map(|t| required_text("Title", &t, MAX_TITLE_LEN))
            .transpose()?,
        director: fields
            .director
            .map(|d| required_text("Director", &d, MAX_DIRECTOR_LEN))
            .transpose()?,
        year: fields.year.map(validate_year).transpose()?,
        genre: fields
            .genre
            .map(|g| optional_text("Genre", Some(g), MAX_GENRE_LEN))
            .transpose()?,
        description: fields
            .description
            .map(|d| optional_text("Description", Some(d), MAX_DESCRIPTION_LEN))
            .transpose()?,
        poster_url: fields.poster_url.map(validate_poster_url).transpose()?,
    };

    if update.is_empty() {
        return Err(CatalogError::validation("No fields provided to update"));
    }
    Ok(update)
}

/// Build search criteria from a query string. Blank parameters are ignored;
/// at least one criterion must remain.
///
/// The year only has to be an integer. A year no movie can have is still a
/// valid filter; it just matches nothing.
pub fn parse_search(query: SearchQuery) -> Result<SearchCriteria> {
    let year = match non_blank(query.year) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| CatalogError::validation(format!("Invalid year: {}", raw)))?,
        ),
        None => None,
    };

    let criteria = SearchCriteria {
        title: non_blank(query.title),
        director: non_blank(query.director),
        genre: non_blank(query.genre),
        year,
    };

    if criteria.is_empty() {
        return Err(CatalogError::validation(
            "At least one search parameter (title, director, genre, year) is required",
        ));
    }
    Ok(criteria)
}

/// Check a poster URL. An empty string means "no poster".
pub fn validate_poster_url(url: String) -> Result<Option<String>> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }
    check_len("Poster URL", url, MAX_POSTER_URL_LEN)?;
    if !POSTER_URL.is_match(url) {
        return Err(CatalogError::validation(
            "Poster URL must be an http(s) link to a jpg, jpeg, png, gif, bmp or webp image",
        ));
    }
    Ok(Some(url.to_string()))
}

fn validate_year(year: i64) -> Result<u16> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year as u16)
    } else {
        Err(CatalogError::validation(format!(
            "Year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        )))
    }
}

fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::validation(format!("{} must not be empty", field)));
    }
    check_len(field, value, max_len)?;
    Ok(value.to_string())
}

fn optional_text(field: &str, value: Option<String>, max_len: usize) -> Result<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            check_len(field, v, max_len)?;
            Ok(Some(v.to_string()))
        }
    }
}

fn check_len(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(CatalogError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
