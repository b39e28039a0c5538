use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_JOB_NAME: &str = "Scraping Job";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Aggregate progress of one batch.
///
/// `processed == successful + failed` holds after every call to
/// [`JobCounters::record`] because that is the only way the counters move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobCounters {
    pub total: i64,
    pub processed: i64,
    pub successful: i64,
    pub failed: i64,
}

impl JobCounters {
    pub fn new(total: i64) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.processed += 1;
    }

    /// Percentage of processed URLs, rounded to one decimal and clamped to [0, 100].
    pub fn progress(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        let pct = self.processed as f64 / self.total as f64 * 100.0;
        round_to_tenth(pct.clamp(0.0, 100.0))
    }
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub status: JobStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub counters: JobCounters,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(name: &str, total: i64) -> Self {
        Job {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: JobStatus::Running,
            counters: JobCounters::new(total),
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct JobStats {
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub running_jobs: i64,
    pub failed_jobs: i64,
    pub total_urls_scraped: i64,
}
