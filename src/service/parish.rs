use std::collections::HashMap;

use chrono::{Local, NaiveDate};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{municipality::MunicipalityDao, parish::ParishDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        demo::DEMO_PARISHES,
        models::{MunicipalityAddInputType, MunicipalityDetailType, MunicipalityInfoType, ParishAddInputType, ParishDetailType, ParishUpdateInputType},
    },
};

/**
 * Number of municipalities in Denmark. A bulk load only replaces the stored municipalities when the stored count differs
 * from this. Exactly 99 is required, more or fewer both trigger a replace.
 */
pub const EXPECTED_MUNICIPALITY_COUNT: i64 = 99;

/**
 * Represents the service for managing parishes and their municipalities.
 */
pub struct ParishService {
    /**
     * The DAO for parish operations.
     */
    parish_dao: ParishDao,
    /**
     * The DAO for municipality operations.
     */
    municipality_dao: MunicipalityDao,
    /**
     * Optional connection pool for database operations. Optional for test purposes until we have a better way to mock the database.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl ParishService {
    /**
     * Creates a new instance of `ParishService`.
     *
     * # Arguments
     * `parish_dao`: The DAO for parish operations.
     * `municipality_dao`: The DAO for municipality operations.
     * `connection_pool`: Optional connection pool for database operations.
     *
     * # Returns
     * A new instance of `ParishService`.
     */
    pub fn new(parish_dao: ParishDao, municipality_dao: MunicipalityDao, connection_pool: Option<Pool<Postgres>>) -> Self {
        ParishService { parish_dao, municipality_dao, connection_pool }
    }

    /**
     * Retrieves every parish.
     *
     * # Returns
     * A Result containing the parishes or an `ApplicationError`.
     */
    pub async fn get_all_parishes(&self) -> Result<Vec<ParishDetailType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.parish_dao.get_parish_list(&mut connection).await
    }

    /**
     * Retrieves a parish by its ID.
     *
     * # Arguments
     * `parish_id`: The ID of the parish as received from the caller.
     *
     * # Returns
     * A Result containing the parish, a `Validation` error if the id is not a number or `NotFound` if it does not exist.
     */
    pub async fn get_parish_by_id(&self, parish_id: &str) -> Result<ParishDetailType, ApplicationError> {
        let parish_id = parse_id(parish_id)?;
        let mut connection = self.acquire().await?;
        self.find_parish(&mut connection, parish_id).await
    }

    /**
     * Creates a new parish linked to an existing municipality.
     *
     * # Arguments
     * `parish_add_input`: The parish to create.
     *
     * # Returns
     * A Result containing the id of the new parish or an `ApplicationError`.
     */
    pub async fn create_parish(&self, parish_add_input: ParishAddInputType) -> Result<i64, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.insert_parish(&mut transaction, parish_add_input).await;
        Self::finish(transaction, result).await
    }

    /**
     * Updates code, name, infection percent and shutdown date of an existing parish.
     *
     * # Arguments
     * `parish_update_input`: The new values of the parish.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn update_parish(&self, parish_update_input: ParishUpdateInputType) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.parish_dao.update_parish(&mut transaction, parish_update_input).await;
        Self::finish(transaction, result).await
    }

    /**
     * Deletes a parish by its ID.
     *
     * # Arguments
     * `parish_id`: The ID of the parish to be deleted.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn delete_parish(&self, parish_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.parish_dao.delete_parish(&mut transaction, parish_id).await;
        Self::finish(transaction, result).await
    }

    /**
     * Replaces the stored municipalities with the given list unless the expected number of municipalities is already stored.
     *
     * # Arguments
     * `municipalities`: The municipalities to store.
     *
     * # Returns
     * A Result containing whether the municipalities were replaced or an `ApplicationError`.
     */
    pub async fn add_municipalities(&self, municipalities: Vec<MunicipalityAddInputType>) -> Result<bool, ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.replace_municipalities(&mut transaction, municipalities).await;
        Self::finish(transaction, result).await
    }

    /**
     * Retrieves the average infection percent of every municipality that has parishes.
     *
     * # Returns
     * A Result containing one entry per populated municipality or an `ApplicationError`.
     */
    pub async fn get_municipality_info(&self) -> Result<Vec<MunicipalityInfoType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.collect_municipality_info(&mut connection).await
    }

    /**
     * Replaces every parish with the fixed demo parishes.
     *
     * # Returns
     * A Result indicating success, `NotFound` if a municipality the demo data refers to is missing.
     */
    pub async fn add_demo_data(&self) -> Result<(), ApplicationError> {
        let mut transaction = self.begin().await?;
        let result = self.seed_demo_data(&mut transaction, Local::now().date_naive()).await;
        Self::finish(transaction, result).await
    }

    async fn find_parish(&self, connection: &mut PgConnection, parish_id: i64) -> Result<ParishDetailType, ApplicationError> {
        self.parish_dao
            .get_parish(connection, parish_id)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, format!("Parish {parish_id} not found")))
    }

    async fn find_municipality(&self, connection: &mut PgConnection, municipality_id: i64) -> Result<MunicipalityDetailType, ApplicationError> {
        self.municipality_dao
            .get_municipality(connection, municipality_id)
            .await?
            .ok_or_else(|| ApplicationError::new(ErrorType::NotFound, format!("Municipality {municipality_id} not found")))
    }

    #[instrument(skip(self, connection))]
    async fn insert_parish(&self, connection: &mut PgConnection, parish_add_input: ParishAddInputType) -> Result<i64, ApplicationError> {
        self.find_municipality(connection, parish_add_input.municipality_id).await?;
        self.parish_dao.add_parish(connection, parish_add_input).await
    }

    #[instrument(skip(self, connection, municipalities), fields(count = municipalities.len()))]
    async fn replace_municipalities(&self, connection: &mut PgConnection, municipalities: Vec<MunicipalityAddInputType>) -> Result<bool, ApplicationError> {
        let existing = self.municipality_dao.count_municipalities(connection).await?;
        if !should_replace_municipalities(existing) {
            tracing::debug!("{} municipalities already stored, skipping bulk load", existing);
            return Ok(false);
        }
        tracing::info!("Replacing {} stored municipalities with {}", existing, municipalities.len());
        self.municipality_dao.delete_all_municipalities(connection).await?;
        for municipality in municipalities {
            self.municipality_dao.add_municipality(connection, municipality).await?;
        }
        Ok(true)
    }

    async fn collect_municipality_info(&self, connection: &mut PgConnection) -> Result<Vec<MunicipalityInfoType>, ApplicationError> {
        let municipalities = self.municipality_dao.get_municipality_list(connection).await?;
        let parishes = self.parish_dao.get_parish_list(connection).await?;
        Ok(aggregate_municipality_info(municipalities, parishes))
    }

    #[instrument(skip(self, connection))]
    async fn seed_demo_data(&self, connection: &mut PgConnection, today: NaiveDate) -> Result<(), ApplicationError> {
        let deleted = self.parish_dao.delete_all_parishes(connection).await?;
        tracing::debug!("Deleted {} parishes before seeding demo data", deleted);
        for demo_parish in &DEMO_PARISHES {
            self.find_municipality(connection, demo_parish.municipality_id).await?;
            self.parish_dao.add_parish(connection, demo_parish.to_input(today)?).await?;
        }
        Ok(())
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Postgres>, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, Postgres>, ApplicationError> {
        let Some(connection_pool) = &self.connection_pool else {
            return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
        };
        connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
    }

    /**
     * Commits the transaction if the result is ok, otherwise rolls it back and returns the original error.
     */
    async fn finish<T>(transaction: sqlx::Transaction<'static, Postgres>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        match result {
            Ok(value) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(value)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }
}

/**
 * Parses a parish id received as text.
 */
fn parse_id(parish_id: &str) -> Result<i64, ApplicationError> {
    parish_id.parse::<i64>().map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid parish id {parish_id}: {err}")))
}

/**
 * Whether a bulk load should replace the stored municipalities.
 */
fn should_replace_municipalities(existing_count: i64) -> bool {
    existing_count != EXPECTED_MUNICIPALITY_COUNT
}

/**
 * Groups parishes by municipality and computes the arithmetic mean of their infection percent. Municipalities without
 * parishes are left out and the order of `municipalities` is kept.
 *
 * # Arguments
 * `municipalities`: All municipalities.
 * `parishes`: All parishes.
 *
 * # Returns
 * One `MunicipalityInfoType` per municipality with at least one parish.
 */
fn aggregate_municipality_info(municipalities: Vec<MunicipalityDetailType>, parishes: Vec<ParishDetailType>) -> Vec<MunicipalityInfoType> {
    let mut parishes_by_municipality: HashMap<i64, Vec<ParishDetailType>> = HashMap::new();
    for parish in parishes {
        parishes_by_municipality.entry(parish.municipality.id).or_default().push(parish);
    }
    municipalities
        .into_iter()
        .filter_map(|municipality| {
            let parishes = parishes_by_municipality.remove(&municipality.id)?;
            if parishes.is_empty() {
                return None;
            }
            #[allow(clippy::cast_precision_loss)]
            let average = parishes.iter().map(|parish| parish.infection_percent).sum::<f64>() / parishes.len() as f64;
            Some(MunicipalityInfoType::new(municipality.name, average, parishes))
        })
        .collect()
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::PgPool;

    #[actix_web::test]
    async fn test_create_then_get_parish() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        let municipality_id = parish_service.municipality_dao.add_municipality(&mut transaction, MunicipalityAddInputType::new("Service Municipality".to_string())).await.unwrap();

        let parish_id = parish_service.insert_parish(&mut transaction, ParishAddInputType::new(91001, "Service Parish".to_string(), 3.0, municipality_id)).await.unwrap();
        let parish = parish_service.find_parish(&mut transaction, parish_id).await.unwrap();
        assert_eq!(parish.code, 91001);
        assert_eq!(parish.name, "Service Parish");
        assert_eq!(parish.infection_percent, 3.0);
        assert!(parish.shutdown_date.is_none());
        assert_eq!(parish.municipality.id, municipality_id);

        let info = parish_service.collect_municipality_info(&mut transaction).await.unwrap();
        let municipality_info = info.iter().find(|info| info.name == "Service Municipality").unwrap();
        assert!(municipality_info.parishes.iter().any(|parish| parish.id == parish_id));
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[actix_web::test]
    async fn test_create_parish_unknown_municipality() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        let result = parish_service.insert_parish(&mut transaction, ParishAddInputType::new(91002, "Lost Parish".to_string(), 3.0, -1)).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_update_parish_idempotent() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        let municipality_id = parish_service.municipality_dao.add_municipality(&mut transaction, MunicipalityAddInputType::new("Update Municipality".to_string())).await.unwrap();
        let parish_id = parish_service.insert_parish(&mut transaction, ParishAddInputType::new(91003, "Update Parish".to_string(), 3.0, municipality_id)).await.unwrap();
        let update = ParishUpdateInputType::new(parish_id, 91004, "Updated Parish".to_string(), 8.25, NaiveDate::from_ymd_opt(2021, 4, 1));

        parish_service.parish_dao.update_parish(&mut transaction, update.clone()).await.unwrap();
        let once = parish_service.find_parish(&mut transaction, parish_id).await.unwrap();
        parish_service.parish_dao.update_parish(&mut transaction, update).await.unwrap();
        let twice = parish_service.find_parish(&mut transaction, parish_id).await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.municipality.id, municipality_id);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_delete_then_get_parish() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        let municipality_id = parish_service.municipality_dao.add_municipality(&mut transaction, MunicipalityAddInputType::new("Delete Municipality".to_string())).await.unwrap();
        let parish_id = parish_service.insert_parish(&mut transaction, ParishAddInputType::new(91005, "Delete Parish".to_string(), 3.0, municipality_id)).await.unwrap();
        parish_service.parish_dao.delete_parish(&mut transaction, parish_id).await.unwrap();
        let result = parish_service.find_parish(&mut transaction, parish_id).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_add_municipalities_noop_when_complete() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        parish_service.municipality_dao.delete_all_municipalities(&mut transaction).await.unwrap();
        assert!(parish_service.replace_municipalities(&mut transaction, municipalities("Kommune", 99)).await.unwrap());
        let replaced = parish_service.replace_municipalities(&mut transaction, municipalities("Other", 5)).await.unwrap();
        assert!(!replaced);
        let stored = parish_service.municipality_dao.get_municipality_list(&mut transaction).await.unwrap();
        assert_eq!(stored.len(), 99);
        assert!(stored.iter().all(|municipality| municipality.name.starts_with("Kommune")));
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_add_municipalities_replaces_incomplete() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        parish_service.municipality_dao.delete_all_municipalities(&mut transaction).await.unwrap();
        parish_service.replace_municipalities(&mut transaction, municipalities("Kommune", 98)).await.unwrap();
        let replaced = parish_service.replace_municipalities(&mut transaction, municipalities("Other", 3)).await.unwrap();
        assert!(replaced);
        assert_eq!(parish_service.municipality_dao.count_municipalities(&mut transaction).await.unwrap(), 3);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_add_demo_data_twice() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        parish_service.municipality_dao.delete_all_municipalities(&mut transaction).await.unwrap();
        parish_service.replace_municipalities(&mut transaction, municipalities("Kommune", 99)).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2021, 1, 15).unwrap();
        parish_service.seed_demo_data(&mut transaction, today).await.unwrap();
        parish_service.seed_demo_data(&mut transaction, today).await.unwrap();
        let parishes = parish_service.parish_dao.get_parish_list(&mut transaction).await.unwrap();
        assert_eq!(parishes.len(), 10);
        let info = parish_service.collect_municipality_info(&mut transaction).await.unwrap();
        assert_eq!(info.len(), 6);
        assert_eq!(info[0].total_infection_percent, 7.5);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_add_demo_data_missing_municipality() {
        let (parish_service, pool) = init_service().await;
        let mut transaction = pool.begin().await.unwrap();
        parish_service.municipality_dao.delete_all_municipalities(&mut transaction).await.unwrap();
        parish_service.replace_municipalities(&mut transaction, municipalities("Kommune", 5)).await.unwrap();
        let result = parish_service.seed_demo_data(&mut transaction, NaiveDate::from_ymd_opt(2021, 1, 15).unwrap()).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }

    #[actix_web::test]
    async fn test_public_operations_commit() {
        let (parish_service, pool) = init_service().await;
        clear_database(&parish_service, &pool).await;
        assert!(parish_service.add_municipalities(municipalities("Kommune", 3)).await.unwrap());

        let parish_id = parish_service.create_parish(ParishAddInputType::new(92001, "Committed Parish".to_string(), 3.0, 2)).await.unwrap();
        let parish = parish_service.get_parish_by_id(&parish_id.to_string()).await.unwrap();
        assert_eq!(parish.name, "Committed Parish");
        assert_eq!(parish.municipality.id, 2);

        let shutdown_date = NaiveDate::from_ymd_opt(2021, 5, 1);
        parish_service.update_parish(ParishUpdateInputType::new(parish_id, 92002, "Renamed Parish".to_string(), 12.0, shutdown_date)).await.unwrap();
        let parish = parish_service.get_parish_by_id(&parish_id.to_string()).await.unwrap();
        assert_eq!(parish.code, 92002);
        assert_eq!(parish.name, "Renamed Parish");
        assert_eq!(parish.shutdown_date, shutdown_date);

        let info = parish_service.get_municipality_info().await.unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].total_infection_percent, 12.0);

        parish_service.delete_parish(parish_id).await.unwrap();
        assert_eq!(parish_service.get_parish_by_id(&parish_id.to_string()).await.unwrap_err().error_type, ErrorType::NotFound);
        assert_eq!(parish_service.delete_parish(parish_id).await.unwrap_err().error_type, ErrorType::NotFound);
        clear_database(&parish_service, &pool).await;
    }

    #[actix_web::test]
    async fn test_failed_create_rolls_back() {
        let (parish_service, pool) = init_service().await;
        clear_database(&parish_service, &pool).await;
        parish_service.add_municipalities(municipalities("Kommune", 2)).await.unwrap();
        parish_service.create_parish(ParishAddInputType::new(92003, "First Parish".to_string(), 1.0, 1)).await.unwrap();

        let duplicate = parish_service.create_parish(ParishAddInputType::new(92003, "Second Parish".to_string(), 1.0, 1)).await;
        assert_eq!(duplicate.unwrap_err().error_type, ErrorType::ConstraintViolation);
        let unknown = parish_service.create_parish(ParishAddInputType::new(92004, "Third Parish".to_string(), 1.0, 42)).await;
        assert_eq!(unknown.unwrap_err().error_type, ErrorType::NotFound);

        let parishes = parish_service.get_all_parishes().await.unwrap();
        assert_eq!(parishes.len(), 1);
        assert_eq!(parishes[0].name, "First Parish");
        clear_database(&parish_service, &pool).await;
    }

    #[actix_web::test]
    async fn test_failed_add_municipalities_rolls_back() {
        let (parish_service, pool) = init_service().await;
        clear_database(&parish_service, &pool).await;
        parish_service.add_municipalities(municipalities("Kommune", 4)).await.unwrap();
        let duplicates = vec![MunicipalityAddInputType::new("Twin".to_string()), MunicipalityAddInputType::new("Twin".to_string())];
        let result = parish_service.add_municipalities(duplicates).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::ConstraintViolation);
        let mut connection = pool.acquire().await.unwrap();
        assert_eq!(parish_service.municipality_dao.count_municipalities(&mut connection).await.unwrap(), 4);
        drop(connection);
        clear_database(&parish_service, &pool).await;
    }

    #[actix_web::test]
    async fn test_add_demo_data_commit() {
        let (parish_service, pool) = init_service().await;
        clear_database(&parish_service, &pool).await;
        assert!(parish_service.add_municipalities(municipalities("Kommune", 99)).await.unwrap());
        assert!(!parish_service.add_municipalities(municipalities("Other", 5)).await.unwrap());
        parish_service.add_demo_data().await.unwrap();
        parish_service.add_demo_data().await.unwrap();
        assert_eq!(parish_service.get_all_parishes().await.unwrap().len(), 10);
        assert_eq!(parish_service.get_municipality_info().await.unwrap().len(), 6);
        clear_database(&parish_service, &pool).await;
    }

    #[actix_web::test]
    async fn test_failed_add_demo_data_keeps_parishes() {
        let (parish_service, pool) = init_service().await;
        clear_database(&parish_service, &pool).await;
        parish_service.add_municipalities(municipalities("Kommune", 5)).await.unwrap();
        parish_service.create_parish(ParishAddInputType::new(92005, "Keep".to_string(), 5.0, 1)).await.unwrap();

        let result = parish_service.add_demo_data().await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);

        let parishes = parish_service.get_all_parishes().await.unwrap();
        assert_eq!(parishes.len(), 1);
        assert_eq!(parishes[0].name, "Keep");
        clear_database(&parish_service, &pool).await;
    }

    fn municipalities(prefix: &str, count: usize) -> Vec<MunicipalityAddInputType> {
        (1..=count).map(|index| MunicipalityAddInputType::new(format!("{prefix} {index}"))).collect()
    }

    /**
     * Initialize the database connection pool and the service.
     */
    async fn init_service() -> (ParishService, PgPool) {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        (ParishService::new(ParishDao::new(), MunicipalityDao::new(), Some(pool.clone())), pool)
    }

    /**
     * Removes every municipality and parish and restarts the id sequences.
     */
    async fn clear_database(parish_service: &ParishService, pool: &PgPool) {
        let mut connection = pool.acquire().await.unwrap();
        parish_service.municipality_dao.delete_all_municipalities(&mut connection).await.unwrap();
    }
}
