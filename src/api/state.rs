use crate::service::parish::ParishService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The parish service for handling parish and municipality operations.
     */
    pub parish_service: ParishService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `parish_service`: The parish service for handling parish and municipality operations.
 */
impl AppState {
    pub fn new(parish_service: ParishService) -> Self {
        AppState { parish_service }
    }
}
