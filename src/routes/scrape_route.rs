use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dal::Store,
    services::{Orchestrator, StartOutcome, StartRequest, StopOutcome},
};

use super::ApiError;

#[post("/scrape")]
async fn start_scraping(
    orchestrator: web::Data<Orchestrator>,
    body: web::Json<StartRequest>,
) -> Result<HttpResponse, ApiError> {
    match orchestrator.start(body.into_inner()).await? {
        StartOutcome::Started { job, .. } => Ok(HttpResponse::Ok().json(json!({
            "message": "Scraping started",
            "status": "processing",
            "job_id": job.id,
        }))),
        StartOutcome::Empty => Ok(HttpResponse::Ok().json(json!({
            "message": "No links to scrape",
            "status": "idle",
            "job_id": null,
        }))),
    }
}

#[post("/stop")]
async fn stop_scraping(orchestrator: web::Data<Orchestrator>) -> HttpResponse {
    let job_id = match orchestrator.stop().await {
        StopOutcome::Requested(job_id) => Some(job_id),
        StopOutcome::NotRunning => None,
    };

    HttpResponse::Ok().json(json!({ "message": "Scraping stopped", "job_id": job_id }))
}

#[get("/status")]
async fn get_status(orchestrator: web::Data<Orchestrator>) -> HttpResponse {
    HttpResponse::Ok().json(orchestrator.snapshot().await)
}

#[post("/clear")]
async fn clear_data(orchestrator: web::Data<Orchestrator>) -> Result<HttpResponse, ApiError> {
    orchestrator.clear().await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Data cleared successfully" })))
}

#[get("/jobs")]
async fn get_jobs(
    orchestrator: web::Data<Orchestrator>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    let stats = store.job_stats().await?;
    Ok(HttpResponse::Ok().json(json!({
        "current_job": orchestrator.snapshot().await,
        "stats": stats,
    })))
}

#[get("/jobs/{job_id}")]
async fn get_job(
    path: web::Path<Uuid>,
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, ApiError> {
    match store.get_job(path.into_inner()).await? {
        Some(job) => Ok(HttpResponse::Ok().json(job)),
        None => Err(ApiError::NotFound("job")),
    }
}

#[get("/stats")]
async fn get_stats(store: web::Data<dyn Store>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(store.job_stats().await?))
}
