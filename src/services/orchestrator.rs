use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;
use tokio::{
    runtime::Handle,
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    configuration::ScraperSettings,
    dal::Store,
    domain::{
        job::{Job, JobCounters, JobStatus, DEFAULT_JOB_NAME},
        profile_link::harvest_profile_links,
        record::{ScrapedRecord, StoredRecord},
        snapshot::StatusSnapshot,
    },
};

use super::{
    broadcaster::{Event, EventSink},
    page_scraper::PageScraper,
    session_pool::{SessionFactory, SessionPool, WorkerId},
};

pub const STOPPED_BY_USER: &str = "Stopped by user";

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Scraping already in progress")]
    Busy,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub job_name: Option<String>,
}

#[derive(Debug)]
pub enum StartOutcome {
    /// Nothing to scrape; no job was created.
    Empty,
    Started { job: Job, handle: JoinHandle<()> },
}

#[derive(Debug, PartialEq)]
pub enum StopOutcome {
    Requested(Uuid),
    NotRunning,
}

/// Soft cancellation. A request is only honoured once every dispatched
/// task has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StopState {
    #[default]
    NotRequested,
    Requested,
    Honored,
}

#[derive(Default)]
struct LiveState {
    snapshot: StatusSnapshot,
    stop: StopState,
    started_at: Option<Instant>,
    active_pool: Option<Arc<SessionPool>>,
    /// Held from the moment a start is accepted until the job has fully
    /// drained. Guards both start and clear.
    reserved: bool,
}

impl LiveState {
    fn elapsed_secs(&self) -> f64 {
        self.started_at
            .map(|started| started.elapsed().as_secs_f64())
            .unwrap_or_default()
    }
}

struct TaskOutcome {
    url: String,
    record: Option<ScrapedRecord>,
}

struct Inner {
    state: Mutex<LiveState>,
    store: Arc<dyn Store>,
    sink: Arc<dyn EventSink>,
    factory: Arc<dyn SessionFactory>,
    scraper: PageScraper,
    workers: usize,
    harvest_base_url: String,
    runtime: Handle,
}

/// Runs one batch at a time across a fixed set of browser workers and keeps
/// the live [`StatusSnapshot`] that observers read.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        sink: Arc<dyn EventSink>,
        factory: Arc<dyn SessionFactory>,
        settings: &ScraperSettings,
        runtime: Handle,
    ) -> Self {
        Orchestrator {
            inner: Arc::new(Inner {
                state: Mutex::new(LiveState::default()),
                store,
                sink,
                factory,
                scraper: PageScraper::from_settings(settings),
                workers: settings.workers.max(1),
                harvest_base_url: settings.harvest_base_url.clone(),
                runtime,
            }),
        }
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.inner.state.lock().await.snapshot.clone()
    }

    /// Accepts a batch and starts it in the background. The job row exists
    /// by the time this returns.
    pub async fn start(&self, request: StartRequest) -> Result<StartOutcome, OrchestratorError> {
        {
            let mut state = self.inner.state.lock().await;
            if state.reserved {
                log::warn!("Rejected start, a job is already running");
                return Err(OrchestratorError::Busy);
            }
            state.reserved = true;
        }

        let urls = collect_urls(&request, &self.inner.harvest_base_url);
        if urls.is_empty() {
            log::info!("No links supplied, nothing to scrape");
            let mut state = self.inner.state.lock().await;
            state.snapshot.is_running = false;
            state.reserved = false;
            return Ok(StartOutcome::Empty);
        }

        let job_name = request
            .job_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_JOB_NAME);

        let job = match self.inner.store.create_job(job_name, urls.len() as i64).await {
            Ok(job) => job,
            Err(e) => {
                log::error!("Error creating job '{}': {:?}", job_name, e);
                self.inner.state.lock().await.reserved = false;
                return Err(e.into());
            }
        };
        log::info!("Started job {} '{}' with {} urls", job.id, job.name, urls.len());

        let pool = Arc::new(SessionPool::new(self.inner.factory.clone()));
        {
            let mut state = self.inner.state.lock().await;
            state.snapshot = StatusSnapshot::for_job(&job);
            state.stop = StopState::NotRequested;
            state.started_at = Some(Instant::now());
            state.active_pool = Some(pool.clone());
            self.inner
                .sink
                .emit(Event::StatusUpdate(state.snapshot.clone()));
        }

        let inner = self.inner.clone();
        let job_id = job.id;
        let handle = self
            .inner
            .runtime
            .spawn(async move { inner.run_job(job_id, urls, pool).await });

        Ok(StartOutcome::Started { job, handle })
    }

    /// Flags the running job as stopped. Tasks already dispatched still run
    /// to completion and their records are still saved. A failed write of
    /// the stop to the job row is logged; the stop itself still stands.
    pub async fn stop(&self) -> StopOutcome {
        let (job_id, completed_at) = {
            let mut state = self.inner.state.lock().await;
            let job_id = match state.snapshot.job_id {
                Some(job_id) if state.snapshot.is_running => job_id,
                _ => return StopOutcome::NotRunning,
            };

            let completed_at = Utc::now();
            state.stop = StopState::Requested;
            state.snapshot.status = Some(JobStatus::Stopped);
            state.snapshot.stop_requested = true;
            state.snapshot.completed_at = Some(completed_at);
            state.snapshot.error_message = Some(STOPPED_BY_USER.to_string());
            self.inner
                .sink
                .emit(Event::StatusUpdate(state.snapshot.clone()));

            (job_id, completed_at)
        };

        log::info!("Stop requested for job {}", job_id);
        if let Err(e) = self
            .inner
            .store
            .finish_job(job_id, JobStatus::Stopped, completed_at, Some(STOPPED_BY_USER))
            .await
        {
            log::error!("Error saving stop of job {}: {:?}", job_id, e);
        }

        StopOutcome::Requested(job_id)
    }

    /// Wipes every job and record. Refused while a job is running.
    pub async fn clear(&self) -> Result<(), OrchestratorError> {
        {
            let mut state = self.inner.state.lock().await;
            if state.reserved {
                return Err(OrchestratorError::Busy);
            }
            state.reserved = true;
        }

        let result = self.inner.store.clear_all().await;

        let mut state = self.inner.state.lock().await;
        state.reserved = false;
        result?;

        state.snapshot = StatusSnapshot::default();
        state.stop = StopState::NotRequested;
        state.started_at = None;
        self.inner
            .sink
            .emit(Event::StatusUpdate(state.snapshot.clone()));
        log::info!("Cleared all jobs and records");

        Ok(())
    }

    /// Closes any browsers still open. Called on process exit.
    pub async fn shutdown(&self) {
        let pool = self.inner.state.lock().await.active_pool.take();
        if let Some(pool) = pool {
            pool.shutdown().await;
        }
    }
}

impl Inner {
    async fn run_job(self: Arc<Self>, job_id: Uuid, urls: Vec<String>, pool: Arc<SessionPool>) {
        let total = urls.len();

        let (task_sender, task_receiver) = mpsc::unbounded_channel::<String>();
        for url in urls {
            _ = task_sender.send(url);
        }
        drop(task_sender);
        let task_receiver = Arc::new(Mutex::new(task_receiver));

        let (outcome_sender, mut outcome_receiver) = mpsc::unbounded_channel::<TaskOutcome>();
        let workers: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker| {
                let inner = self.clone();
                let tasks = task_receiver.clone();
                let outcomes = outcome_sender.clone();
                let pool = pool.clone();
                tokio::spawn(async move { inner.work(worker, tasks, outcomes, pool).await })
            })
            .collect();
        drop(outcome_sender);

        let mut resolved = 0;
        while let Some(outcome) = outcome_receiver.recv().await {
            resolved += 1;
            self.apply_outcome(job_id, outcome).await;
        }

        for (worker, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                log::error!("Worker {} of job {} died: {}", worker, job_id, e);
            }
        }
        log::info!("Closing {} browser sessions of job {}", pool.live_sessions().await, job_id);
        pool.shutdown().await;

        self.finish(job_id, total.saturating_sub(resolved)).await;
    }

    async fn work(
        &self,
        worker: WorkerId,
        tasks: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
        outcomes: mpsc::UnboundedSender<TaskOutcome>,
        pool: Arc<SessionPool>,
    ) {
        loop {
            let Some(url) = tasks.lock().await.recv().await else {
                break;
            };
            self.set_current_url(&url).await;

            let record = match pool.acquire(worker).await {
                Some(session) => self.scraper.scrape(&url, session.as_ref()).await,
                None => {
                    log::error!("No browser for worker {}, failing {}", worker, url);
                    None
                }
            };

            if outcomes.send(TaskOutcome { url, record }).is_err() {
                break;
            }
        }
    }

    async fn set_current_url(&self, url: &str) {
        let mut state = self.state.lock().await;
        state.snapshot.current_url = url.to_string();
        self.sink.emit(Event::StatusUpdate(state.snapshot.clone()));
    }

    /// Persists one result and folds it into the counters. Only the
    /// coordinating task calls this, in completion order.
    async fn apply_outcome(&self, job_id: Uuid, outcome: TaskOutcome) {
        let success = match outcome.record {
            Some(record) => match self.store.upsert_record(job_id, &record).await {
                Ok(id) => {
                    self.sink.emit(Event::NewData(StoredRecord { id, job_id, record }));
                    true
                }
                Err(e) => {
                    log::error!("Error saving record for {}: {:?}", outcome.url, e);
                    false
                }
            },
            None => false,
        };

        let counters = {
            let mut state = self.state.lock().await;
            let elapsed = state.elapsed_secs();
            state.snapshot.record_outcome(success, elapsed);
            self.sink.emit(Event::StatusUpdate(state.snapshot.clone()));
            state.snapshot.counters
        };

        self.save_counters(job_id, &counters).await;
    }

    async fn finish(&self, job_id: Uuid, missing: usize) {
        let (status, counters, completed_at) = {
            let mut state = self.state.lock().await;
            if missing > 0 {
                log::error!("{} urls of job {} never reported back", missing, job_id);
            }
            for _ in 0..missing {
                state.snapshot.counters.record(false);
            }
            let elapsed = state.elapsed_secs();
            state.snapshot.refresh(elapsed);

            let status = match state.stop {
                StopState::NotRequested => JobStatus::Completed,
                StopState::Requested | StopState::Honored => {
                    state.stop = StopState::Honored;
                    JobStatus::Stopped
                }
            };
            let completed_at: DateTime<Utc> = match status {
                JobStatus::Stopped => state.snapshot.completed_at.unwrap_or_else(Utc::now),
                _ => Utc::now(),
            };

            state.snapshot.status = Some(status);
            state.snapshot.is_running = false;
            state.snapshot.current_url.clear();
            state.snapshot.completed_at = Some(completed_at);
            self.sink.emit(Event::StatusUpdate(state.snapshot.clone()));

            (status, state.snapshot.counters, completed_at)
        };

        self.save_counters(job_id, &counters).await;
        if let Err(e) = self
            .store
            .finish_job(job_id, status, completed_at, None)
            .await
        {
            log::error!("Error finishing job {}: {:?}", job_id, e);
        }

        let mut state = self.state.lock().await;
        state.active_pool = None;
        state.reserved = false;

        log::info!(
            "Job {} ended {:?}: {} processed, {} successful, {} failed",
            job_id,
            status,
            counters.processed,
            counters.successful,
            counters.failed
        );
    }

    async fn save_counters(&self, job_id: Uuid, counters: &JobCounters) {
        if let Err(e) = self.store.update_job_counters(job_id, counters).await {
            log::error!("Error saving counters of job {}: {:?}", job_id, e);
        }
    }
}

/// Harvested links first, then the direct ones. Blank entries are dropped
/// and each URL is kept once, at its first position.
fn collect_urls(request: &StartRequest, base_url: &str) -> Vec<String> {
    let harvested = match request.html_content.as_deref() {
        Some(html) if !html.trim().is_empty() => harvest_profile_links(html, Some(base_url)),
        _ => vec![],
    };

    harvested
        .into_iter()
        .chain(request.links.iter().cloned())
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .unique()
        .collect()
}
