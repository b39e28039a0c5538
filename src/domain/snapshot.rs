use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::job::{round_to_tenth, Job, JobCounters, JobStatus};

/// Read-only copy of the live job state handed to observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub job_id: Option<Uuid>,
    pub job_name: Option<String>,
    pub is_running: bool,
    pub status: Option<JobStatus>,
    #[serde(flatten)]
    pub counters: JobCounters,
    pub current_url: String,
    pub progress: f64,
    /// Records per minute since the job started.
    pub speed: f64,
    pub stop_requested: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl StatusSnapshot {
    pub fn for_job(job: &Job) -> Self {
        StatusSnapshot {
            job_id: Some(job.id),
            job_name: Some(job.name.clone()),
            is_running: true,
            status: Some(job.status),
            counters: job.counters,
            created_at: Some(job.created_at),
            ..Default::default()
        }
    }

    /// Applies one finished task and recomputes progress and throughput.
    pub fn record_outcome(&mut self, success: bool, elapsed_secs: f64) {
        self.counters.record(success);
        self.refresh(elapsed_secs);
    }

    pub fn refresh(&mut self, elapsed_secs: f64) {
        self.progress = self.counters.progress();
        self.speed = match elapsed_secs > 0.0 && self.counters.processed > 0 {
            true => round_to_tenth(self.counters.processed as f64 / elapsed_secs * 60.0),
            false => 0.0,
        };
    }
}
