use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use actix_web::web;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{runtime::Handle, sync::Semaphore};
use uuid::Uuid;

use crate::{
    configuration::ScraperSettings,
    dal::Store,
    domain::{
        job::{Job, JobCounters, JobStats, JobStatus},
        record::{RecordQuery, ScrapedRecord, StoredRecord},
        snapshot::StatusSnapshot,
    },
    services::{
        broadcaster::{Broadcaster, Event, EventSink},
        orchestrator::Orchestrator,
        page_scraper::BLANK_PAGE,
        session_pool::{BrowserSession, ScrapeError, SessionFactory},
    },
};

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<Uuid, Job>,
    records: HashMap<String, StoredRecord>,
    next_record_id: i64,
}

/// `Store` kept in process memory, with the same upsert-by-link rule as Postgres.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    pub fail_upserts: AtomicBool,
    pub fail_job_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, job_id: Uuid) -> Option<Job> {
        self.state.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.state.lock().unwrap().jobs.len()
    }

    pub fn record(&self, page_link: &str) -> Option<StoredRecord> {
        self.state.lock().unwrap().records.get(page_link).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    fn sorted_records(&self) -> Vec<StoredRecord> {
        let mut records: Vec<StoredRecord> =
            self.state.lock().unwrap().records.values().cloned().collect();
        records.sort_by(|a, b| {
            b.record
                .scraped_at
                .cmp(&a.record.scraped_at)
                .then(b.id.cmp(&a.id))
        });
        records
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_job(&self, name: &str, total: i64) -> Result<Job, sqlx::Error> {
        let job = Job::new(name, total);
        self.state.lock().unwrap().jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn update_job_counters(
        &self,
        job_id: Uuid,
        counters: &JobCounters,
    ) -> Result<(), sqlx::Error> {
        if let Some(job) = self.state.lock().unwrap().jobs.get_mut(&job_id) {
            job.counters.processed = counters.processed;
            job.counters.successful = counters.successful;
            job.counters.failed = counters.failed;
        }
        Ok(())
    }

    async fn finish_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        completed_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        if self.fail_job_writes.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("write refused".to_string()));
        }

        if let Some(job) = self.state.lock().unwrap().jobs.get_mut(&job_id) {
            job.status = status;
            job.completed_at = Some(completed_at);
            if let Some(message) = error_message {
                job.error_message = Some(message.to_string());
            }
        }
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.job(job_id))
    }

    async fn job_stats(&self) -> Result<JobStats, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let count = |status: JobStatus| state.jobs.values().filter(|j| j.status == status).count();

        Ok(JobStats {
            total_jobs: state.jobs.len() as i64,
            completed_jobs: count(JobStatus::Completed) as i64,
            running_jobs: count(JobStatus::Running) as i64,
            failed_jobs: count(JobStatus::Failed) as i64,
            total_urls_scraped: state.jobs.values().map(|j| j.counters.total).sum(),
        })
    }

    async fn upsert_record(
        &self,
        job_id: Uuid,
        record: &ScrapedRecord,
    ) -> Result<i64, sqlx::Error> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("write refused".to_string()));
        }

        let mut state = self.state.lock().unwrap();
        let id = match state.records.get(&record.page_link) {
            Some(existing) => existing.id,
            None => {
                state.next_record_id += 1;
                state.next_record_id
            }
        };
        state.records.insert(
            record.page_link.clone(),
            StoredRecord {
                id,
                job_id,
                record: record.clone(),
            },
        );
        Ok(id)
    }

    async fn list_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecord>, sqlx::Error> {
        Ok(self
            .sorted_records()
            .into_iter()
            .filter(|r| query.job_id.map_or(true, |job_id| r.job_id == job_id))
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn export_records(&self) -> Result<Vec<StoredRecord>, sqlx::Error> {
        Ok(self.sorted_records())
    }

    async fn clear_all(&self) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.records.clear();
        state.jobs.clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<StatusSnapshot> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::StatusUpdate(snapshot) => Some(snapshot.clone()),
                Event::NewData(_) => None,
            })
            .collect()
    }

    pub fn new_data(&self) -> Vec<StoredRecord> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::NewData(record) => Some(record.clone()),
                Event::StatusUpdate(_) => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone)]
pub enum FakePage {
    Loaded {
        body: String,
        heading: Option<String>,
        block: Option<String>,
    },
    /// The body never shows up.
    Timeout,
}

impl FakePage {
    pub fn loaded(body: &str) -> Self {
        FakePage::Loaded {
            body: body.to_string(),
            heading: None,
            block: None,
        }
    }

    pub fn with_heading(self, text: &str) -> Self {
        match self {
            FakePage::Loaded { body, block, .. } => FakePage::Loaded {
                body,
                heading: Some(text.to_string()),
                block,
            },
            page => page,
        }
    }

    pub fn with_block(self, text: &str) -> Self {
        match self {
            FakePage::Loaded { body, heading, .. } => FakePage::Loaded {
                body,
                heading,
                block: Some(text.to_string()),
            },
            page => page,
        }
    }
}

/// A scripted set of pages served to fake browser sessions. Navigation to a
/// real page waits on `gate`, so a gated web holds jobs in flight until
/// [`FakeWeb::release`] is called.
pub struct FakeWeb {
    pages: HashMap<String, FakePage>,
    gate: Arc<Semaphore>,
    visits: Mutex<Vec<String>>,
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
    pub fail_creation: AtomicBool,
}

impl FakeWeb {
    pub fn new() -> Self {
        FakeWeb {
            pages: HashMap::new(),
            gate: Arc::new(Semaphore::new(Semaphore::MAX_PERMITS)),
            visits: Mutex::new(vec![]),
            created: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            fail_creation: AtomicBool::new(false),
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Arc::new(Semaphore::new(0));
        self
    }

    pub fn release(&self, navigations: usize) {
        self.gate.add_permits(navigations);
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

pub struct FakeSession {
    web: Arc<FakeWeb>,
    current: Mutex<Option<FakePage>>,
}

impl FakeSession {
    fn current(&self) -> Option<FakePage> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        self.web.visits.lock().unwrap().push(url.to_string());
        if url == BLANK_PAGE {
            *self.current.lock().unwrap() = None;
            return Ok(());
        }

        self.web
            .gate
            .acquire()
            .await
            .map_err(|e| ScrapeError::Navigation(e.to_string()))?
            .forget();

        match self.web.pages.get(url) {
            Some(page) => {
                *self.current.lock().unwrap() = Some(page.clone());
                Ok(())
            }
            None => Err(ScrapeError::Navigation(format!("unreachable: {}", url))),
        }
    }

    async fn wait_for_body(&self, timeout: Duration) -> Result<String, ScrapeError> {
        match self.current() {
            Some(FakePage::Loaded { body, .. }) => Ok(body),
            Some(FakePage::Timeout) => Err(ScrapeError::Timeout(timeout, "document body")),
            None => Err(ScrapeError::SessionClosed),
        }
    }

    async fn heading(&self) -> Result<Option<String>, ScrapeError> {
        match self.current() {
            Some(FakePage::Loaded { heading, .. }) => Ok(heading),
            _ => Ok(None),
        }
    }

    async fn labelled_block(&self) -> Result<Option<String>, ScrapeError> {
        match self.current() {
            Some(FakePage::Loaded { block, .. }) => Ok(block),
            _ => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.web.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeFactory {
    web: Arc<FakeWeb>,
}

impl FakeFactory {
    pub fn new(web: Arc<FakeWeb>) -> Self {
        FakeFactory { web }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn create(&self) -> Result<Arc<dyn BrowserSession>, ScrapeError> {
        if self.web.fail_creation.load(Ordering::SeqCst) {
            return Err(ScrapeError::SessionStart("browser refused to start".to_string()));
        }
        self.web.created.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(FakeSession {
            web: self.web.clone(),
            current: Mutex::new(None),
        }))
    }
}

/// Everything the HTTP handlers pull from app data, wired to fakes.
pub struct TestDeps {
    pub store: Arc<MemoryStore>,
    pub web: Arc<FakeWeb>,
    pub broadcaster: Arc<Broadcaster>,
    pub orchestrator: Orchestrator,
    pub settings: ScraperSettings,
}

impl TestDeps {
    pub fn new(web: FakeWeb) -> Self {
        let store = Arc::new(MemoryStore::new());
        let web = Arc::new(web);
        let broadcaster = Arc::new(Broadcaster::new());
        let settings = ScraperSettings {
            ready_timeout_secs: 1,
            navigation_timeout_secs: 1,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(
            store.clone(),
            broadcaster.clone(),
            Arc::new(FakeFactory::new(web.clone())),
            &settings,
            Handle::current(),
        );

        TestDeps {
            store,
            web,
            broadcaster,
            orchestrator,
            settings,
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        crate::routes::configure_extractors(cfg);

        let store: Arc<dyn Store> = self.store.clone();
        cfg.app_data(web::Data::from(store))
            .app_data(web::Data::new(self.orchestrator.clone()))
            .app_data(web::Data::from(self.broadcaster.clone()))
            .app_data(web::Data::new(self.settings.clone()));
    }
}
