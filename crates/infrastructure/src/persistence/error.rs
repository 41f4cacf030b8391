//! Shared error mapping for sqlx persistence layer

use application::error::ApplicationError;

// SQLite primary result codes
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Map a sqlx error to an application-layer error
///
/// Lock contention and pool exhaustion are transient and surface as
/// `StoreUnavailable`; unique violations surface as `Duplicate`.
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::RowNotFound => {
            ApplicationError::NotFound("Database record not found".to_string())
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            ApplicationError::StoreUnavailable(format!("Database unavailable: {e}"))
        },
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                return ApplicationError::Duplicate(db_err.message().to_string());
            }
            let code = db_err.code();
            let primary = code.as_deref().map(|c| {
                c.parse::<i32>()
                    .map_or_else(|_| c.to_string(), |n| (n & 0xff).to_string())
            });
            match primary.as_deref() {
                Some(SQLITE_BUSY | SQLITE_LOCKED) => {
                    ApplicationError::StoreUnavailable(format!("Database busy: {db_err}"))
                },
                _ => ApplicationError::Internal(format!("Database error: {db_err}")),
            }
        },
        other => ApplicationError::Internal(format!("Database error: {other}")),
    }
}
