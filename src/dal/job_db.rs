use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::job::{Job, JobCounters, JobStats, JobStatus};

pub async fn insert_job(job: &Job, pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        insert into jobs
            (id, name, status, total, processed, successful, failed, created_at)
        values
            ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(job.id)
    .bind(&job.name)
    .bind(job.status)
    .bind(job.counters.total)
    .bind(job.counters.processed)
    .bind(job.counters.successful)
    .bind(job.counters.failed)
    .bind(job.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_job_counters(
    job_id: Uuid,
    counters: &JobCounters,
    pool: &PgPool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        update jobs set
            processed = $2,
            successful = $3,
            failed = $4
        where
            id = $1
        ",
    )
    .bind(job_id)
    .bind(counters.processed)
    .bind(counters.successful)
    .bind(counters.failed)
    .execute(pool)
    .await?;

    Ok(())
}

/// Moves a job to a terminal status. An existing error message is kept
/// when `error_message` is `None`.
pub async fn finish_job(
    job_id: Uuid,
    status: JobStatus,
    completed_at: DateTime<Utc>,
    error_message: Option<&str>,
    pool: &PgPool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        update jobs set
            status = $2,
            completed_at = $3,
            error_message = coalesce($4, error_message)
        where
            id = $1
        ",
    )
    .bind(job_id)
    .bind(status)
    .bind(completed_at)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_job(job_id: Uuid, pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(
        r"
        select
            id,
            name,
            status,
            total,
            processed,
            successful,
            failed,
            created_at,
            completed_at,
            error_message
        from
            jobs
        where
            id = $1
        ",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_job_stats(pool: &PgPool) -> Result<JobStats, sqlx::Error> {
    sqlx::query_as::<_, JobStats>(
        r"
        select
            count(*) as total_jobs,
            count(*) filter (where status = 'COMPLETED') as completed_jobs,
            count(*) filter (where status = 'RUNNING') as running_jobs,
            count(*) filter (where status = 'FAILED') as failed_jobs,
            coalesce(sum(total), 0)::bigint as total_urls_scraped
        from
            jobs
        ",
    )
    .fetch_one(pool)
    .await
}
