// sqlx::Error -> AppError
//
// Orphan rules keep `From<sqlx::Error>` out of core, so every query maps
// through here.

use salonq_core::error::AppError;

/// Unique index that enforces one queue slot per customer
const MEMBERSHIP_INDEX: &str = "queue_entries.customer_id";
const EMAIL_INDEX: &str = "customers.contact_email";

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            let Some(code) = db_err.code() else {
                return AppError::Database(format!("Database error: {}", message));
            };

            // SQLite extended result codes: https://www.sqlite.org/rescode.html
            match code.as_ref() {
                "2067" | "1555" if message.contains(MEMBERSHIP_INDEX) => {
                    AppError::Conflict(format!("customer already holds a queue slot ({})", message))
                }
                "2067" | "1555" if message.contains(EMAIL_INDEX) => {
                    AppError::Conflict("contact email already registered".to_string())
                }
                "2067" | "1555" => {
                    AppError::Database(format!("Unique constraint violation: {}", message))
                }
                "787" | "3850" => {
                    AppError::Database(format!("Foreign key constraint violation: {}", message))
                }
                "5" | "517" => AppError::Database(format!("Database locked (SQLITE_BUSY): {}", message)),
                "13" => AppError::Database(format!("Database full: {}", message)),
                other => AppError::Database(format!("Database error [{}]: {}", other, message)),
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}
