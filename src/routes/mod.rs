pub mod api_error;
pub mod default_route;
pub mod event_route;
pub mod record_route;
pub mod scrape_route;
pub mod upload_route;

use actix_web::{web, Scope};

pub use api_error::ApiError;

/// Every `/api` endpoint.
pub fn api_scope() -> Scope {
    web::scope("/api")
        .service(scrape_route::start_scraping)
        .service(scrape_route::stop_scraping)
        .service(scrape_route::get_status)
        .service(scrape_route::clear_data)
        .service(scrape_route::get_jobs)
        .service(scrape_route::get_job)
        .service(scrape_route::get_stats)
        .service(record_route::get_data)
        .service(record_route::export_data)
        .service(upload_route::upload_html)
        .service(event_route::events)
}

/// Malformed bodies, query strings and path segments come back as
/// `{"error": ...}` like every other failure.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|e, _| ApiError::BadRequest(e.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|e, _| ApiError::BadRequest(e.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|e, _| ApiError::BadRequest(e.to_string()).into()),
    );
}
