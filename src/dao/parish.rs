use chrono::NaiveDate;
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::{check_single_row, handle_database_error},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{MunicipalityDetailType, ParishAddInputType, ParishDetailType, ParishUpdateInputType},
    },
};

/**
 * Database response type for querying parishes joined with their municipality.
 */
pub type QueryParishDbResp = (i64, i32, String, f64, Option<NaiveDate>, i64, String);

/**
 * SQL query to retrieve all parishes.
 */
const QUERY_PARISH_LIST: &str = "SELECT a.id, a.code, a.name, a.infection_percent, a.shutdown_date, b.id AS municipality_id, b.name AS municipality_name
                                 FROM parish a, municipality b
                                 WHERE a.municipality_id = b.id
                                 ORDER BY a.id";

/**
 * SQL query to retrieve a single parish.
 */
const QUERY_PARISH: &str = "SELECT a.id, a.code, a.name, a.infection_percent, a.shutdown_date, b.id AS municipality_id, b.name AS municipality_name
                            FROM parish a, municipality b
                            WHERE a.municipality_id = b.id AND a.id = $1";

/**
 * SQL query to add a new parish.
 */
const ADD_PARISH: &str = "INSERT INTO parish (code, name, infection_percent, shutdown_date, municipality_id) VALUES ($1, $2, $3, $4, $5) RETURNING id";

/**
 * SQL query to update a parish. The municipality reference is left untouched.
 */
const UPDATE_PARISH: &str = "UPDATE parish SET code = $1, name = $2, infection_percent = $3, shutdown_date = $4 WHERE id = $5";

/**
 * SQL query to delete a parish.
 */
const DELETE_PARISH: &str = "DELETE FROM parish WHERE id = $1";

/**
 * SQL query to delete every parish.
 */
const DELETE_ALL_PARISHES: &str = "DELETE FROM parish";

impl From<QueryParishDbResp> for ParishDetailType {
    fn from(row: QueryParishDbResp) -> Self {
        ParishDetailType::new(row.0, row.1, row.2, row.3, row.4, MunicipalityDetailType::new(row.5, row.6))
    }
}

/**
 * DAO for parish-related database operations.
 */
pub struct ParishDao {}

impl ParishDao {
    /**
     * Creates a new instance of `ParishDao`.
     *
     * # Returns
     * A new instance of `ParishDao`.
     */
    pub fn new() -> Self {
        ParishDao {}
    }

    /**
     * Retrieves all parishes ordered by id.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * A Result containing the parishes or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_parish_list(&self, connection: &mut PgConnection) -> Result<Vec<ParishDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryParishDbResp> = sqlx::query_as(QUERY_PARISH_LIST)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get parish list: {err}")))?;
        Ok(results.into_iter().map(ParishDetailType::from).collect())
    }

    /**
     * Retrieves a parish by its ID.
     *
     * # Arguments
     * `connection`: The database connection.
     * `parish_id`: The ID of the parish.
     *
     * # Returns
     * A Result containing the parish if it exists or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_parish(&self, connection: &mut PgConnection, parish_id: i64) -> Result<Option<ParishDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryParishDbResp> = sqlx::query_as(QUERY_PARISH)
            .bind(parish_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get parish: {err}")))?;
        Ok(result.map(ParishDetailType::from))
    }

    /**
     * Adds a new parish to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `parish_add_input`: The input containing details of the parish to be added.
     *
     * # Returns
     * A result containing the generated id.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_parish(&self, transaction: &mut PgConnection, parish_add_input: ParishAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_PARISH)
            .bind(parish_add_input.code)
            .bind(parish_add_input.name)
            .bind(parish_add_input.infection_percent)
            .bind(parish_add_input.shutdown_date)
            .bind(parish_add_input.municipality_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(id.0)
    }

    /**
     * Updates an existing parish in the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `parish_update_input`: The input containing the id and the new values of the parish.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_parish(&self, transaction: &mut PgConnection, parish_update_input: ParishUpdateInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let parish_id = parish_update_input.id;
        let result = sqlx::query(UPDATE_PARISH)
            .bind(parish_update_input.code)
            .bind(parish_update_input.name)
            .bind(parish_update_input.infection_percent)
            .bind(parish_update_input.shutdown_date)
            .bind(parish_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        check_single_row(result.rows_affected(), "Parish", parish_id)
    }

    /**
     * Deletes a parish from the database by its ID.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `parish_id`: The ID of the parish to be deleted.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_parish(&self, transaction: &mut PgConnection, parish_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_PARISH)
            .bind(parish_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete parish: {err}")))?;
        check_single_row(result.rows_affected(), "Parish", parish_id)
    }

    /**
     * Deletes every parish.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     *
     * # Returns
     * A result containing the number of deleted parishes.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_all_parishes(&self, transaction: &mut PgConnection) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_ALL_PARISHES)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete parishes: {err}")))?;
        Ok(result.rows_affected())
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{dao::municipality::MunicipalityDao, model::models::MunicipalityAddInputType};
    use sqlx::PgPool;

    #[actix_web::test]
    async fn test_add_update_then_delete_parish() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let parish_dao = ParishDao::new();
        let municipality_dao = MunicipalityDao::new();
        let municipality_id = municipality_dao.add_municipality(&mut transaction, MunicipalityAddInputType::new("Dao Test Municipality".to_string())).await.unwrap();

        let parish_id = parish_dao.add_parish(&mut transaction, ParishAddInputType::new(90001, "Dao Test Parish".to_string(), 4.5, municipality_id)).await.unwrap();
        let parish = parish_dao.get_parish(&mut transaction, parish_id).await.unwrap().unwrap();
        assert_eq!(parish.code, 90001);
        assert_eq!(parish.municipality.id, municipality_id);
        assert!(parish.shutdown_date.is_none());

        let shutdown_date = NaiveDate::from_ymd_opt(2021, 2, 1);
        parish_dao.update_parish(&mut transaction, ParishUpdateInputType::new(parish_id, 90002, "Dao Test Parish Updated".to_string(), 1.5, shutdown_date)).await.unwrap();
        let parish = parish_dao.get_parish(&mut transaction, parish_id).await.unwrap().unwrap();
        assert_eq!(parish.code, 90002);
        assert_eq!(parish.shutdown_date, shutdown_date);

        parish_dao.delete_parish(&mut transaction, parish_id).await.unwrap();
        assert!(parish_dao.get_parish(&mut transaction, parish_id).await.unwrap().is_none());
        let delete_again = parish_dao.delete_parish(&mut transaction, parish_id).await;
        assert_eq!(delete_again.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[actix_web::test]
    async fn test_add_parish_missing_municipality() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let parish_dao = ParishDao::new();
        let result = parish_dao.add_parish(&mut transaction, ParishAddInputType::new(90003, "Orphan Parish".to_string(), 1.0, -1)).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_update_missing_parish() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let parish_dao = ParishDao::new();
        let result = parish_dao.update_parish(&mut transaction, ParishUpdateInputType::new(-1, 1, "Missing".to_string(), 1.0, None)).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    /**
     * Initialize the database connection pool.
     */
    async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
