use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{MunicipalityAddInputType, MunicipalityDetailType, MunicipalityInfoType, ParishAddInputType, ParishDetailType, ParishUpdateInputType},
};

/***************** Parish models *********************/

/**
 * Request structure for creating and updating a parish.
 *
 * Every field is optional on the wire so that a missing field is reported as a validation error naming the field.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParishRequest {
    /**
     * Ignored on create, required on update.
     */
    pub parish_id: Option<i64>,
    pub parish_code: Option<i32>,
    pub parish_name: Option<String>,
    pub parish_infection_percent: Option<f64>,
    pub parish_shutdown_date: Option<NaiveDate>,
    /**
     * Required on create, ignored on update.
     */
    pub municipality_id: Option<i64>,
}

impl TryFrom<ParishRequest> for ParishAddInputType {
    type Error = ApplicationError;

    fn try_from(request: ParishRequest) -> Result<Self, Self::Error> {
        Ok(ParishAddInputType::new(
            required(request.parish_code, "parishCode")?,
            required(request.parish_name, "parishName")?,
            required(request.parish_infection_percent, "parishInfectionPercent")?,
            required(request.municipality_id, "municipalityId")?,
        ))
    }
}

impl TryFrom<ParishRequest> for ParishUpdateInputType {
    type Error = ApplicationError;

    fn try_from(request: ParishRequest) -> Result<Self, Self::Error> {
        Ok(ParishUpdateInputType::new(
            required(request.parish_id, "parishId")?,
            required(request.parish_code, "parishCode")?,
            required(request.parish_name, "parishName")?,
            required(request.parish_infection_percent, "parishInfectionPercent")?,
            request.parish_shutdown_date,
        ))
    }
}

/**
 * Response structure for a parish.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParishResponse {
    parish_id: i64,
    parish_code: i32,
    parish_name: String,
    infection_percent: f64,
    /**
     * Absent means the parish is not shut down.
     */
    shutdown_date: Option<NaiveDate>,
    municipality: MunicipalityResponse,
}

impl From<ParishDetailType> for ParishResponse {
    fn from(parish: ParishDetailType) -> Self {
        ParishResponse {
            parish_id: parish.id,
            parish_code: parish.code,
            parish_name: parish.name,
            infection_percent: parish.infection_percent,
            shutdown_date: parish.shutdown_date,
            municipality: MunicipalityResponse::from(parish.municipality),
        }
    }
}

/***************** Municipality models *********************/

/**
 * Request structure for one municipality of a bulk load. Any other field sent, such as an id, is ignored.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityAddRequest {
    pub municipality_name: Option<String>,
}

impl TryFrom<MunicipalityAddRequest> for MunicipalityAddInputType {
    type Error = ApplicationError;

    fn try_from(request: MunicipalityAddRequest) -> Result<Self, Self::Error> {
        Ok(MunicipalityAddInputType::new(required(request.municipality_name, "municipalityName")?))
    }
}

/**
 * Response structure for the municipality a parish belongs to.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityResponse {
    municipality_id: i64,
    municipality_name: String,
}

impl From<MunicipalityDetailType> for MunicipalityResponse {
    fn from(municipality: MunicipalityDetailType) -> Self {
        MunicipalityResponse { municipality_id: municipality.id, municipality_name: municipality.name }
    }
}

/**
 * Response structure for the aggregated infection information of a municipality.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityInfoResponse {
    municipality_name: String,
    /**
     * Average infection percent of the parishes in the municipality.
     */
    total_infection_percent: f64,
    parishes: Vec<ParishResponse>,
}

impl From<MunicipalityInfoType> for MunicipalityInfoResponse {
    fn from(info: MunicipalityInfoType) -> Self {
        MunicipalityInfoResponse {
            municipality_name: info.name,
            total_infection_percent: info.total_infection_percent,
            parishes: info.parishes.into_iter().map(ParishResponse::from).collect(),
        }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::DatabaseError => 1002,
        ErrorType::Application => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::ConstraintViolation => 1005,
        ErrorType::Validation => 1006,
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApplicationError> {
    value.ok_or_else(|| ApplicationError::new(ErrorType::Validation, format!("{field} is required")))
}
