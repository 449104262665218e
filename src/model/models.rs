use chrono::NaiveDate;

use crate::model::apperror::{ApplicationError, ErrorType};

/***************** Municipality models *********************/

/**
 * A municipality as stored in the database.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityDetailType {
    pub id: i64,
    pub name: String,
}

impl MunicipalityDetailType {
    pub fn new(id: i64, name: String) -> Self {
        MunicipalityDetailType { id, name }
    }
}

/**
 * Input for adding a municipality as part of a bulk load.
 */
#[derive(Debug, Clone)]
pub struct MunicipalityAddInputType {
    pub name: String,
}

impl MunicipalityAddInputType {
    pub fn new(name: String) -> Self {
        MunicipalityAddInputType { name }
    }

    /**
     * Validates the input.
     *
     * # Returns
     * The input itself or a validation error if the name is blank.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "municipalityName is required".to_string()));
        }
        Ok(self)
    }
}

/**
 * Aggregated infection information for a single municipality.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityInfoType {
    pub name: String,
    /**
     * Arithmetic mean of the infection percent of the parishes. Not weighted by population.
     */
    pub total_infection_percent: f64,
    pub parishes: Vec<ParishDetailType>,
}

impl MunicipalityInfoType {
    pub fn new(name: String, total_infection_percent: f64, parishes: Vec<ParishDetailType>) -> Self {
        MunicipalityInfoType { name, total_infection_percent, parishes }
    }
}

/***************** Parish models *********************/

/**
 * A parish together with the municipality it belongs to.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ParishDetailType {
    pub id: i64,
    pub code: i32,
    pub name: String,
    pub infection_percent: f64,
    pub shutdown_date: Option<NaiveDate>,
    pub municipality: MunicipalityDetailType,
}

impl ParishDetailType {
    pub fn new(id: i64, code: i32, name: String, infection_percent: f64, shutdown_date: Option<NaiveDate>, municipality: MunicipalityDetailType) -> Self {
        ParishDetailType { id, code, name, infection_percent, shutdown_date, municipality }
    }
}

/**
 * Input for adding a parish.
 */
#[derive(Debug, Clone)]
pub struct ParishAddInputType {
    pub code: i32,
    pub name: String,
    pub infection_percent: f64,
    pub shutdown_date: Option<NaiveDate>,
    pub municipality_id: i64,
}

impl ParishAddInputType {
    /**
     * Creates a new parish input. A new parish has no shutdown date.
     */
    pub fn new(code: i32, name: String, infection_percent: f64, municipality_id: i64) -> Self {
        ParishAddInputType { code, name, infection_percent, shutdown_date: None, municipality_id }
    }

    /**
     * Sets the shutdown date.
     */
    pub fn with_shutdown_date(mut self, shutdown_date: NaiveDate) -> Self {
        self.shutdown_date = Some(shutdown_date);
        self
    }

    /**
     * Validates the input.
     *
     * # Returns
     * The input itself or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        validate_parish_fields(&self.name, self.infection_percent)?;
        Ok(self)
    }
}

/**
 * Input for updating a parish. The owning municipality cannot be changed.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ParishUpdateInputType {
    pub id: i64,
    pub code: i32,
    pub name: String,
    pub infection_percent: f64,
    pub shutdown_date: Option<NaiveDate>,
}

impl ParishUpdateInputType {
    pub fn new(id: i64, code: i32, name: String, infection_percent: f64, shutdown_date: Option<NaiveDate>) -> Self {
        ParishUpdateInputType { id, code, name, infection_percent, shutdown_date }
    }

    /**
     * Validates the input.
     *
     * # Returns
     * The input itself or a validation error.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        validate_parish_fields(&self.name, self.infection_percent)?;
        Ok(self)
    }
}

fn validate_parish_fields(name: &str, infection_percent: f64) -> Result<(), ApplicationError> {
    if name.trim().is_empty() {
        return Err(ApplicationError::new(ErrorType::Validation, "parishName is required".to_string()));
    }
    if !infection_percent.is_finite() {
        return Err(ApplicationError::new(ErrorType::Validation, "parishInfectionPercent must be a number".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parish_add_input_has_no_shutdown_date() {
        let input = ParishAddInputType::new(1, "Fjeldeby".to_string(), 3.0, 1);
        assert!(input.shutdown_date.is_none());
        let date = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        assert_eq!(input.with_shutdown_date(date).shutdown_date, Some(date));
    }

    #[test]
    fn test_parish_add_input_blank_name() {
        let result = ParishAddInputType::new(1, "  ".to_string(), 3.0, 1).validate();
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_parish_update_input_not_a_number() {
        let result = ParishUpdateInputType::new(1, 1, "Bov".to_string(), f64::NAN, None).validate();
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_parish_update_input_valid() {
        let input = ParishUpdateInputType::new(1, 1, "Bov".to_string(), 27.0, None);
        assert_eq!(input.clone().validate().unwrap(), input);
    }

    #[test]
    fn test_municipality_add_input_blank_name() {
        let result = MunicipalityAddInputType::new(String::new()).validate();
        assert_eq!(result.unwrap_err().error_type, ErrorType::Validation);
        assert!(MunicipalityAddInputType::new("Aarhus".to_string()).validate().is_ok());
    }
}
