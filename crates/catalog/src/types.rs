//! Core domain types for the movie catalog.
//!
//! Raw request payloads live in [`crate::validation`]; everything here has
//! already been validated and is safe to hand to the store.

use serde::Serialize;

use crate::rating::AverageRating;

// =============================================================================
// Type Aliases
// =============================================================================

/// Server-assigned identifier of a catalog item (always positive)
pub type MovieId = i64;

// =============================================================================
// Movie Records
// =============================================================================

/// A stored movie, as returned by the API.
///
/// The rating fields are only ever written by the rating aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub director: String,
    pub year: Option<u16>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
    pub average_rating: AverageRating,
    pub num_ratings: u32,
}

/// A validated movie waiting to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub director: String,
    pub year: Option<u16>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
}

/// A validated partial update.
///
/// `None` leaves a column untouched. For the optional columns,
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub director: Option<String>,
    pub year: Option<u16>,
    pub genre: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub poster_url: Option<Option<String>>,
}

impl MovieUpdate {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.director.is_none()
            && self.year.is_none()
            && self.genre.is_none()
            && self.description.is_none()
            && self.poster_url.is_none()
    }
}

// =============================================================================
// Search
// =============================================================================

/// Filter for catalog searches. All present criteria must match.
///
/// Text criteria are case-insensitive substrings; `year` is an exact match.
/// Construct through [`crate::validation::parse_search`], which rejects an
/// empty filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub title: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i64>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.director.is_none() && self.genre.is_none() && self.year.is_none()
    }
}
