use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::record::{RecordQuery, ScrapedRecord, StoredRecord};

/// Inserts the record, or overwrites the row that already holds its
/// `page_link`. Returns the row id.
pub async fn upsert_record(
    job_id: Uuid,
    record: &ScrapedRecord,
    pool: &PgPool,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r"
        insert into records
            (job_id, name, email, phone, country, page_link, website, location, address,
             likes, followers, scrape_time, scraped_at, status, error_message)
        values
            ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        on conflict(page_link) do update set
            job_id = excluded.job_id,
            name = excluded.name,
            email = excluded.email,
            phone = excluded.phone,
            country = excluded.country,
            website = excluded.website,
            location = excluded.location,
            address = excluded.address,
            likes = excluded.likes,
            followers = excluded.followers,
            scrape_time = excluded.scrape_time,
            scraped_at = excluded.scraped_at,
            status = excluded.status,
            error_message = excluded.error_message
        returning id
        ",
    )
    .bind(job_id)
    .bind(&record.name)
    .bind(&record.email)
    .bind(&record.phone)
    .bind(&record.country)
    .bind(&record.page_link)
    .bind(&record.website)
    .bind(&record.location)
    .bind(&record.address)
    .bind(record.likes)
    .bind(record.followers)
    .bind(record.scrape_time)
    .bind(record.scraped_at)
    .bind(record.status)
    .bind(&record.error_message)
    .fetch_one(pool)
    .await
}

pub async fn get_records(
    query: &RecordQuery,
    pool: &PgPool,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r"
        select
            *
        from
            records
        where
            $1::uuid is null or job_id = $1
        order by scraped_at desc, id desc
        limit $2
        offset $3
        ",
    )
    .bind(query.job_id)
    .bind(query.limit)
    .bind(query.offset)
    .fetch_all(pool)
    .await
}

pub async fn get_all_records(pool: &PgPool) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r"
        select
            *
        from
            records
        order by scraped_at desc, id desc
        ",
    )
    .fetch_all(pool)
    .await
}

pub async fn delete_all(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("delete from records").execute(&mut *tx).await?;
    sqlx::query("delete from jobs").execute(&mut *tx).await?;
    tx.commit().await
}
