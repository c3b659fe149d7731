//! # Catalog Crate
//!
//! Domain model of the movie catalog. Nothing in here touches the database
//! or the network; the `store` and `server` crates build on these types.
//!
//! ## Main Components
//!
//! - **types**: Movie records, validated create/update payloads, search criteria
//! - **rating**: Rating values and the running per-movie aggregate
//! - **validation**: Turn raw request payloads into validated types
//! - **error**: The error taxonomy shared by every layer
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{Rating, RatingAggregate};
//!
//! let agg = RatingAggregate::EMPTY
//!     .fold(Rating::try_from(4)?)
//!     .fold(Rating::try_from(2)?)
//!     .fold(Rating::try_from(5)?);
//!
//! assert_eq!(agg.average.to_string(), "3.67");
//! assert_eq!(agg.count, 3);
//! ```

pub mod error;
pub mod rating;
pub mod types;
pub mod validation;

pub use error::{CatalogError, Result};
pub use rating::{AggregateView, AverageRating, Rating, RatingAggregate, RatingOutcome};
pub use types::{Movie, MovieId, MovieUpdate, NewMovie, SearchCriteria};
pub use validation::{MovieFields, SearchQuery};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_round_trip_through_fold() {
        let movie = validation::validate_new(MovieFields {
            title: Some("The Shawshank Redemption".to_string()),
            director: Some("Frank Darabont".to_string()),
            year: Some(1994),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(movie.year, Some(1994));

        let ratings = [5i64, 5, 4].map(|v| Rating::try_from(v).unwrap());
        let agg = RatingAggregate::from_ratings(ratings);
        assert_eq!(agg.average.to_string(), "4.67");
    }
}
