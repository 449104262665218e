use actix_web::{
    HttpRequest, HttpResponse, delete, get,
    http::header,
    post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        pages::{municipals_page, parishes_page},
        rest::{MunicipalityAddRequest, MunicipalityInfoResponse, ParishRequest, ParishResponse},
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{MunicipalityAddInputType, ParishAddInputType, ParishUpdateInputType},
    },
};

/**
 * Registers the pages and API endpoints together with the extractor configuration.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _http_request| ApplicationError::new(ErrorType::Validation, format!("Invalid request body: {err}")).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _http_request| ApplicationError::new(ErrorType::Validation, format!("Invalid path parameter: {err}")).into()))
        .service(parishes_page)
        .service(municipals_page)
        .service(all_parishes)
        .service(parish_by_id)
        .service(parish_create)
        .service(parish_update)
        .service(parish_delete)
        .service(municipalities_add)
        .service(demo_data_add)
        .service(municipality_info);
}

/**
 * Endpoint to retrieve every parish.
 */
#[instrument(skip(http_request, app_state), fields(service = "allParishes", trace_id = get_trace_id(&http_request)))]
#[get("/api/allParishes")]
pub async fn all_parishes(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let parishes = app_state.parish_service.get_all_parishes().instrument(span).await?;
    Ok(HttpResponse::Ok().json(parishes.into_iter().map(ParishResponse::from).collect::<Vec<ParishResponse>>()))
}

/**
 * Endpoint to retrieve a single parish.
 */
#[instrument(skip(http_request, app_state), fields(service = "getParishById", trace_id = get_trace_id(&http_request)))]
#[get("/api/getParishById/{parishId}")]
pub async fn parish_by_id(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let parish_id = path.into_inner();
    let parish = app_state.parish_service.get_parish_by_id(&parish_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ParishResponse::from(parish)))
}

/**
 * Endpoint to create a parish in an existing municipality.
 */
#[instrument(skip(http_request, app_state), fields(service = "createParish", trace_id = get_trace_id(&http_request)))]
#[post("/api/create")]
pub async fn parish_create(http_request: HttpRequest, request_body: web::Json<ParishRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let parish_add_input = ParishAddInputType::try_from(request_body.into_inner())?.validate()?;
    let parish_id = app_state.parish_service.create_parish(parish_add_input).instrument(span).await?;
    Ok(HttpResponse::Created().insert_header((header::LOCATION, format!("/api/getParishById/{parish_id}"))).finish())
}

/**
 * Endpoint to update a parish.
 */
#[instrument(skip(http_request, app_state), fields(service = "updateParish", trace_id = get_trace_id(&http_request)))]
#[post("/api/updateParish")]
pub async fn parish_update(http_request: HttpRequest, request_body: web::Json<ParishRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let parish_update_input = ParishUpdateInputType::try_from(request_body.into_inner())?.validate()?;
    app_state.parish_service.update_parish(parish_update_input).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Endpoint to delete a parish.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteParish", trace_id = get_trace_id(&http_request)))]
#[delete("/api/delete/{parishId}")]
pub async fn parish_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let parish_id = path.into_inner();
    app_state.parish_service.delete_parish(parish_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to bulk load municipalities.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "addMunicipalities", trace_id = get_trace_id(&http_request)))]
#[post("/api/addMunicipalities")]
pub async fn municipalities_add(http_request: HttpRequest, request_body: web::Json<Vec<MunicipalityAddRequest>>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let municipalities = request_body
        .into_inner()
        .into_iter()
        .map(|request| MunicipalityAddInputType::try_from(request).and_then(MunicipalityAddInputType::validate))
        .collect::<Result<Vec<MunicipalityAddInputType>, ApplicationError>>()?;
    app_state.parish_service.add_municipalities(municipalities).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Endpoint to replace all parishes with demo data.
 */
#[instrument(skip(http_request, app_state), fields(service = "addDemoData", trace_id = get_trace_id(&http_request)))]
#[get("/api/addDemoData")]
pub async fn demo_data_add(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.parish_service.add_demo_data().instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Endpoint to retrieve the average infection percent per municipality.
 */
#[instrument(skip(http_request, app_state), fields(service = "municipalityInfo", trace_id = get_trace_id(&http_request)))]
#[get("/api/municipalityInfo")]
pub async fn municipality_info(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let info = app_state.parish_service.get_municipality_info().instrument(span).await?;
    Ok(HttpResponse::Ok().json(info.into_iter().map(MunicipalityInfoResponse::from).collect::<Vec<MunicipalityInfoResponse>>()))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
