use chrono::{NaiveDate, TimeDelta};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::ParishAddInputType,
};

/**
 * A fixed parish used for seeding demo data.
 */
#[derive(Debug)]
pub struct DemoParish {
    pub code: i32,
    pub name: &'static str,
    pub infection_percent: f64,
    /**
     * Days relative to today for the shutdown date. Negative is in the past.
     */
    pub shutdown_offset_days: i64,
    /**
     * Municipality the parish belongs to. Must exist before seeding.
     */
    pub municipality_id: i64,
}

pub const DEMO_PARISHES: [DemoParish; 10] = [
    DemoParish { code: 1, name: "Fjeldeby", infection_percent: 3.0, shutdown_offset_days: -1, municipality_id: 1 },
    DemoParish { code: 2, name: "Nørre Vissing", infection_percent: 12.0, shutdown_offset_days: 1, municipality_id: 1 },
    DemoParish { code: 3, name: "Gyllen", infection_percent: 2.0, shutdown_offset_days: -2, municipality_id: 2 },
    DemoParish { code: 4, name: "Bov", infection_percent: 27.0, shutdown_offset_days: 2, municipality_id: 2 },
    DemoParish { code: 5, name: "Klippeby", infection_percent: 21.0, shutdown_offset_days: -3, municipality_id: 2 },
    DemoParish { code: 6, name: "Amalienborg", infection_percent: 59.0, shutdown_offset_days: 3, municipality_id: 3 },
    DemoParish { code: 7, name: "Lemming", infection_percent: 3.0, shutdown_offset_days: -4, municipality_id: 3 },
    DemoParish { code: 8, name: "Store Lille Snede Nørre", infection_percent: 5.0, shutdown_offset_days: 4, municipality_id: 4 },
    DemoParish { code: 9, name: "Lille Store Nørre Snede", infection_percent: 6.0, shutdown_offset_days: -5, municipality_id: 5 },
    DemoParish { code: 10, name: "Storby", infection_percent: 12.0, shutdown_offset_days: 5, municipality_id: 10 },
];

impl DemoParish {
    /**
     * Converts the demo parish into an add input with the shutdown date relative to `today`.
     *
     * # Arguments
     * `today`: The date the offsets are relative to.
     *
     * # Returns
     * The parish add input or an error if the date is out of range.
     */
    pub fn to_input(&self, today: NaiveDate) -> Result<ParishAddInputType, ApplicationError> {
        let shutdown_date = today
            .checked_add_signed(TimeDelta::days(self.shutdown_offset_days))
            .ok_or_else(|| ApplicationError::new(ErrorType::Application, format!("Shutdown date out of range for demo parish {}", self.code)))?;
        Ok(ParishAddInputType::new(self.code, self.name.to_string(), self.infection_percent, self.municipality_id).with_shutdown_date(shutdown_date))
    }
}
