use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extractor::ContactDetails;

pub const NAME_MAX_CHARS: usize = 100;
pub const ADDRESS_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Failed,
}

/// Result of scraping one page. `page_link` is the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ScrapedRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub page_link: String,
    pub website: String,
    pub location: String,
    pub address: String,
    pub likes: i64,
    pub followers: i64,
    pub scrape_time: f64,
    pub scraped_at: DateTime<Utc>,
    pub status: RecordStatus,
    pub error_message: Option<String>,
}

impl ScrapedRecord {
    pub fn from_contact_details(page_link: &str, name: &str, details: ContactDetails) -> Self {
        ScrapedRecord {
            name: truncate_chars(name.trim(), NAME_MAX_CHARS),
            email: details.email,
            phone: details.phone,
            country: details.country,
            page_link: page_link.to_string(),
            website: details.website,
            location: String::new(),
            address: String::new(),
            likes: details.likes,
            followers: details.followers,
            scrape_time: 0.0,
            scraped_at: Utc::now(),
            status: RecordStatus::Success,
            error_message: None,
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = truncate_chars(address, ADDRESS_MAX_CHARS);
        self
    }

    /// Seconds spent scraping, rounded to hundredths.
    pub fn with_scrape_time(mut self, seconds: f64) -> Self {
        self.scrape_time = (seconds * 100.0).round() / 100.0;
        self
    }
}

/// A record as it sits in the store.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: i64,
    pub job_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: ScrapedRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub job_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            job_id: None,
            limit: 100,
            offset: 0,
        }
    }
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
