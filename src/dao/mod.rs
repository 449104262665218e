pub mod municipality;
pub mod parish;

use std::borrow::Cow;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Handles database errors and maps them to application errors.
 *
 * # Arguments
 * `error`: The database error to handle.
 *
 * # Returns
 * An `ApplicationError` corresponding to the database error.
 */
pub fn handle_database_error(error: Option<&dyn sqlx::error::DatabaseError>) -> ApplicationError {
    if let Some(db_error) = error {
        tracing::debug!("Database error: {}", db_error);
        tracing::info!("Add/Update error: {:?}", db_error.code());
        if db_error.code() == Some(Cow::Borrowed("23505")) {
            // Unique violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("23503")) {
            // Foreign key violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("22001")) {
            // Value too long
            return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
        }
        tracing::error!("Unhandled database error: {}", db_error);
        return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
    }
    ApplicationError::new(ErrorType::DatabaseError, "Failed to execute database operation".to_string())
}

/**
 * Checks that a single row was affected by an update or delete.
 *
 * # Arguments
 * `rows_affected`: Number of rows affected by the statement.
 * `entity`: Name of the entity used in error messages.
 * `id`: Identifier the statement targeted.
 *
 * # Returns
 * `NotFound` when no row was affected, `Application` when more than one was.
 */
pub fn check_single_row(rows_affected: u64, entity: &str, id: i64) -> Result<(), ApplicationError> {
    if rows_affected == 0 {
        tracing::debug!("{} with ID {} not found", entity, id);
        return Err(ApplicationError::new(ErrorType::NotFound, format!("{entity} not found")));
    }
    if rows_affected > 1 {
        tracing::warn!("Multiple {} rows affected for ID {}. Rolled back", entity, id);
        return Err(ApplicationError::new(ErrorType::Application, format!("Multiple {entity} rows affected. Rolled back")));
    }
    Ok(())
}
