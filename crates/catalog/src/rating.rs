//! Rating values and the running per-movie aggregate.
//!
//! The aggregate keeps the exact integer sum of every rating next to the
//! count, so the displayed average is recomputed from exact values on every
//! fold and never accumulates rounding error.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CatalogError, Result};

/// Lowest accepted rating
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating
pub const MAX_RATING: u8 = 5;

/// A single submitted rating, guaranteed to be in `1..=5`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub fn value(self) -> u8 {
        self.0
    }

    /// Parse a rating out of a JSON payload value.
    ///
    /// Only JSON integers are accepted: `4.5`, `"4"` and `null` are all
    /// rejected, as is anything outside `1..=5`.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(v) => Rating::try_from(v),
                None if n.is_u64() => Err(CatalogError::InvalidRating(format!(
                    "{} is outside {}..={}",
                    n, MIN_RATING, MAX_RATING
                ))),
                None => Err(CatalogError::InvalidRating(format!(
                    "{} is not an integer",
                    n
                ))),
            },
            Value::Null => Err(CatalogError::InvalidRating(
                "rating is required".to_string(),
            )),
            other => Err(CatalogError::InvalidRating(format!(
                "expected an integer, got {}",
                other
            ))),
        }
    }
}

impl TryFrom<i64> for Rating {
    type Error = CatalogError;

    fn try_from(value: i64) -> Result<Self> {
        if (MIN_RATING as i64..=MAX_RATING as i64).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(CatalogError::InvalidRating(format!(
                "{} is outside {}..={}",
                value, MIN_RATING, MAX_RATING
            )))
        }
    }
}

/// Average rating with two fixed fractional digits, stored as hundredths.
///
/// `367` means `3.67`. Serializes as a plain JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AverageRating(u16);

impl AverageRating {
    pub const ZERO: AverageRating = AverageRating(0);

    pub fn from_hundredths(hundredths: u16) -> Self {
        AverageRating(hundredths)
    }

    pub fn hundredths(self) -> u16 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `round2(total / count)`, rounding half away from zero.
    ///
    /// Everything is non-negative, so half away from zero is half up and
    /// the whole computation stays in integers.
    pub fn from_total(total: u64, count: u32) -> Self {
        if count == 0 {
            return AverageRating::ZERO;
        }
        let count = count as u64;
        let hundredths = (total * 200 + count) / (count * 2);
        AverageRating(hundredths as u16)
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for AverageRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// The `(averageRating, numRatings)` pair of one movie, plus the exact sum
/// it is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingAggregate {
    pub average: AverageRating,
    pub count: u32,
    pub total: u64,
}

impl RatingAggregate {
    /// Aggregate of a movie nobody has rated yet: `(0.00, 0)`
    pub const EMPTY: RatingAggregate = RatingAggregate {
        average: AverageRating::ZERO,
        count: 0,
        total: 0,
    };

    /// Fold one more rating into the aggregate
    pub fn fold(&self, rating: Rating) -> RatingAggregate {
        let count = self.count.saturating_add(1);
        let total = self.total + rating.value() as u64;
        RatingAggregate {
            average: AverageRating::from_total(total, count),
            count,
            total,
        }
    }

    /// Fold a whole sequence of ratings, starting from `EMPTY`
    pub fn from_ratings<I>(ratings: I) -> RatingAggregate
    where
        I: IntoIterator<Item = Rating>,
    {
        ratings
            .into_iter()
            .fold(RatingAggregate::EMPTY, |agg, rating| agg.fold(rating))
    }

    pub fn outcome(&self) -> RatingOutcome {
        RatingOutcome {
            new_average: self.average,
            new_count: self.count,
        }
    }
}

/// Result of a successful rating submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub new_average: AverageRating,
    pub new_count: u32,
}

/// Read-side view of an aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub average_rating: AverageRating,
    pub num_ratings: u32,
}

impl From<RatingAggregate> for AggregateView {
    fn from(agg: RatingAggregate) -> Self {
        AggregateView {
            average_rating: agg.average,
            num_ratings: agg.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn r(v: i64) -> Rating {
        Rating::try_from(v).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_from(0i64).is_err());
        assert!(Rating::try_from(6i64).is_err());
        assert!(Rating::try_from(-3i64).is_err());
        for v in 1..=5i64 {
            assert_eq!(Rating::try_from(v).unwrap().value() as i64, v);
        }
    }

    #[test]
    fn test_rating_from_json_rejects_non_integers() {
        assert_eq!(Rating::from_json(&json!(4)).unwrap(), r(4));
        assert!(matches!(
            Rating::from_json(&json!(4.5)),
            Err(CatalogError::InvalidRating(_))
        ));
        assert!(matches!(
            Rating::from_json(&json!("4")),
            Err(CatalogError::InvalidRating(_))
        ));
        assert!(matches!(
            Rating::from_json(&Value::Null),
            Err(CatalogError::InvalidRating(_))
        ));
        assert!(matches!(
            Rating::from_json(&json!(9)),
            Err(CatalogError::InvalidRating(_))
        ));
    }

    #[test]
    fn test_huge_integer_is_out_of_range() {
        let err = Rating::from_json(&json!(u64::MAX)).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidRating("18446744073709551615 is outside 1..=5".to_string())
        );
    }

    #[test]
    fn test_fold_scenario() {
        let agg = RatingAggregate::EMPTY.fold(r(4));
        assert_eq!((agg.average.to_string(), agg.count), ("4.00".to_string(), 1));

        let agg = agg.fold(r(2));
        assert_eq!((agg.average.to_string(), agg.count), ("3.00".to_string(), 2));

        let agg = agg.fold(r(5));
        assert_eq!((agg.average.to_string(), agg.count), ("3.67".to_string(), 3));
        assert_eq!(agg.total, 11);
    }

    #[test]
    fn test_rounding_is_half_up() {
        // 1/8 = 0.125 -> 0.13
        assert_eq!(AverageRating::from_total(1, 8).hundredths(), 13);
        // 2/3 = 0.666.. -> 0.67
        assert_eq!(AverageRating::from_total(2, 3).hundredths(), 67);
        // 10/6 = 1.666.. -> 1.67
        assert_eq!(AverageRating::from_total(10, 6).hundredths(), 167);
        // 5/6 = 0.8333.. -> 0.83
        assert_eq!(AverageRating::from_total(5, 6).hundredths(), 83);
        assert_eq!(AverageRating::from_total(0, 0), AverageRating::ZERO);
    }

    #[test]
    fn test_no_drift_over_long_sequences() {
        // A sequence whose rounded running mean would drift if the total
        // were rebuilt from the rounded average every step.
        let ratings: Vec<Rating> = (0..3000).map(|i| r([1, 2, 2][i % 3])).collect();
        let agg = RatingAggregate::from_ratings(ratings);

        assert_eq!(agg.count, 3000);
        assert_eq!(agg.total, 5000);
        assert_eq!(agg.average.to_string(), "1.67");
    }

    #[test]
    fn test_average_stays_in_range() {
        let high = RatingAggregate::from_ratings(vec![r(5); 50]);
        assert_eq!(high.average.hundredths(), 500);

        let low = RatingAggregate::from_ratings(vec![r(1); 50]);
        assert_eq!(low.average.hundredths(), 100);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RatingAggregate::from_ratings(vec![r(4), r(2), r(5)]).outcome();
        let json = serde_json::to_value(outcome).unwrap();

        assert_eq!(json["newAverage"].as_f64(), Some(3.67));
        assert_eq!(json["newCount"], 3);
    }
}
