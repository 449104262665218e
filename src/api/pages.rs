use actix_web::{HttpResponse, get, http::header::ContentType};

const PARISHES_PAGE: &str = include_str!("../../static/parishes.html");

const MUNICIPALS_PAGE: &str = include_str!("../../static/municipals.html");

/**
 * Page listing parishes with create, edit and delete actions.
 */
#[get("/")]
pub async fn parishes_page() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(PARISHES_PAGE)
}

/**
 * Page showing the average infection percent per municipality.
 */
#[get("/municipals")]
pub async fn municipals_page() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(MUNICIPALS_PAGE)
}
