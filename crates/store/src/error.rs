//! Mapping from SQLite failures onto the catalog error taxonomy.

use catalog::CatalogError;
use rusqlite::{ErrorCode, ffi};
use tracing::error;

/// Translate a `rusqlite` error.
///
/// A uniqueness violation is the caller's fault and becomes `Conflict`;
/// every other failure means the store could not do its job.
pub(crate) fn sql_error(err: rusqlite::Error) -> CatalogError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
            return CatalogError::Conflict(
                "A movie with this title and director already exists".to_string(),
            );
        }
        if failure.code == ErrorCode::DatabaseBusy || failure.code == ErrorCode::DatabaseLocked {
            error!("Store is busy: {}", err);
            return CatalogError::StoreUnavailable("database is busy, try again".to_string());
        }
    }
    error!("Store error: {}", err);
    CatalogError::StoreUnavailable(err.to_string())
}
