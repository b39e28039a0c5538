use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dal::Store,
    domain::record::RecordQuery,
    services::{export_filename, records_to_csv},
};

use super::ApiError;

const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Deserialize)]
struct DataQuery {
    job_id: Option<Uuid>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl From<DataQuery> for RecordQuery {
    fn from(query: DataQuery) -> Self {
        let defaults = RecordQuery::default();
        RecordQuery {
            job_id: query.job_id,
            limit: query.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.unwrap_or(defaults.offset).max(0),
        }
    }
}

#[get("/data")]
async fn get_data(
    store: web::Data<dyn Store>,
    query: web::Query<DataQuery>,
) -> Result<HttpResponse, ApiError> {
    let records = store.list_records(&query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[get("/export")]
async fn export_data(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    let records = store.export_records().await?;
    let body = records_to_csv(&records)?;
    let filename = export_filename(Utc::now());
    log::info!("Exporting {} records as {}", records.len(), filename);

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .append_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body))
}
