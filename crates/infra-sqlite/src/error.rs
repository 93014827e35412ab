// sqlx error mapping

use speedcompare_core::error::AppError;

/// Convert sqlx::Error to AppError; unique violations become `Conflict`
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // SQLite: https://www.sqlite.org/rescode.html
            Some("2067") | Some("1555") => AppError::Conflict(format!(
                "Unique constraint violation: {}",
                db_err.message()
            )),
            Some("5") => AppError::Database(format!(
                "Database locked (SQLITE_BUSY): {}",
                db_err.message()
            )),
            Some("13") => AppError::Database(format!("Database full: {}", db_err.message())),
            Some(code) => AppError::Database(format!(
                "Database error [{}]: {}",
                code,
                db_err.message()
            )),
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}
