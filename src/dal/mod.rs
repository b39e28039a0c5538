pub mod job_db;
pub mod record_db;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    job::{Job, JobCounters, JobStats, JobStatus},
    record::{RecordQuery, ScrapedRecord, StoredRecord},
};

/// Durable home for jobs and records. Implementations must accept writes
/// from several workers at once; record writes are keyed by `page_link`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_job(&self, name: &str, total: i64) -> Result<Job, sqlx::Error>;

    async fn update_job_counters(
        &self,
        job_id: Uuid,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error>;

    async fn finish_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error>;

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error>;

    async fn job_stats(&self) -> Result<JobStats, sqlx::Error>;

    async fn upsert_record(&self, job_id: Uuid, record: &ScrapedRecord)
        -> Result<i64, sqlx::Error>;

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, sqlx::Error>;

    /// Every record, most recent first.
    async fn export_records(&self) -> Result<Vec<StoredRecord>, sqlx::Error>;

    async fn clear_all(&self) -> Result<(), sqlx::Error>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_job(&self, name: &str, total: i64) -> Result<Job, sqlx::Error> {
        let job = Job::new(name, total);
        job_db::insert_job(&job, &self.pool).await?;
        Ok(job)
    }

    async fn update_job_counters(
        &self,
        job_id: Uuid,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error> {
        job_db::update_job_counters(job_id, counters, &self.pool).await
    }

    async fn finish_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        job_db::finish_job(job_id, status, completed_at, error_message, &self.pool).await
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        job_db::get_job(job_id, &self.pool).await
    }

    async fn job_stats(&self) -> Result<JobStats, sqlx::Error> {
        job_db::get_job_stats(&self.pool).await
    }

    async fn upsert_record(
        &self,
        job_id: Uuid,
        record: &ScrapedRecord,
    ) -> Result<i64, sqlx::Error> {
        record_db::upsert_record(job_id, record, &self.pool).await
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, sqlx::Error> {
        record_db::get_records(query, &self.pool).await
    }

    async fn export_records(&self) -> Result<Vec<StoredRecord>, sqlx::Error> {
        record_db::get_all_records(&self.pool).await
    }

    async fn clear_all(&self) -> Result<(), sqlx::Error> {
        record_db::delete_all(&self.pool).await
    }
}
