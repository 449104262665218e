use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::handle_database_error,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{MunicipalityAddInputType, MunicipalityDetailType},
    },
};

/**
 * Database response type for querying municipalities.
 */
pub type QueryMunicipalityDbResp = (i64, String);

/**
 * SQL query to retrieve all municipalities.
 */
const QUERY_MUNICIPALITY_LIST: &str = "SELECT id, name FROM municipality ORDER BY id";

/**
 * SQL query to retrieve a municipality by id.
 */
const QUERY_MUNICIPALITY: &str = "SELECT id, name FROM municipality WHERE id = $1";

/**
 * SQL query to count municipalities.
 */
const COUNT_MUNICIPALITIES: &str = "SELECT COUNT(*) FROM municipality";

/**
 * SQL query to add a new municipality.
 */
const ADD_MUNICIPALITY: &str = "INSERT INTO municipality (name) VALUES ($1) RETURNING id";

/**
 * SQL query to delete every municipality. Parishes go with them through the foreign key cascade and
 * identity sequences start over.
 */
const DELETE_ALL_MUNICIPALITIES: &str = "TRUNCATE TABLE municipality RESTART IDENTITY CASCADE";

impl From<QueryMunicipalityDbResp> for MunicipalityDetailType {
    fn from(row: QueryMunicipalityDbResp) -> Self {
        MunicipalityDetailType::new(row.0, row.1)
    }
}

/**
 * DAO for municipality-related database operations.
 */
pub struct MunicipalityDao {}

impl MunicipalityDao {
    /**
     * Creates a new instance of `MunicipalityDao`.
     *
     * # Returns
     * A new instance of `MunicipalityDao`.
     */
    pub fn new() -> Self {
        MunicipalityDao {}
    }

    /**
     * Retrieves all municipalities ordered by id.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A Result containing the municipalities or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_municipality_list(&self, connection: &mut PgConnection) -> Result<Vec<MunicipalityDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryMunicipalityDbResp> = sqlx::query_as(QUERY_MUNICIPALITY_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get municipality list: {err}")))?;
        Ok(results.into_iter().map(MunicipalityDetailType::from).collect())
    }

    /**
     * Retrieves a municipality by its ID.
     *
     * # Arguments
     * `connection`: The database connection.
     * `municipality_id`: The ID of the municipality.
     *
     * # Returns
     * A Result containing the municipality if it exists or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_municipality(&self, connection: &mut PgConnection, municipality_id: i64) -> Result<Option<MunicipalityDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryMunicipalityDbResp> = sqlx::query_as(QUERY_MUNICIPALITY)
            .bind(municipality_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get municipality: {err}")))?;
        Ok(result.map(MunicipalityDetailType::from))
    }

    /**
     * Counts the stored municipalities.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A Result containing the number of municipalities or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn count_municipalities(&self, connection: &mut PgConnection) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let count: (i64,) = sqlx::query_as(COUNT_MUNICIPALITIES)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to count municipalities: {err}")))?;
        Ok(count.0)
    }

    /**
     * Adds a new municipality to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `municipality_add_input`: The input containing details of the municipality to be added.
     *
     * # Returns
     * A result containing the generated id.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_municipality(&self, transaction: &mut PgConnection, municipality_add_input: MunicipalityAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_MUNICIPALITY)
            .bind(municipality_add_input.name)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Deletes all municipalities and, through the cascade, all parishes.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_all_municipalities(&self, transaction: &mut PgConnection) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(DELETE_ALL_MUNICIPALITIES)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete municipalities: {err}")))?;
        Ok(())
    }
}
