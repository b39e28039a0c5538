use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use tokio::sync::Mutex;

pub type WorkerId = usize;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("could not start browser session: {0}")]
    SessionStart(String),
    #[error("browser session is closed")]
    SessionClosed,
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, &'static str),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error(transparent)]
    Driver(#[from] WebDriverError),
}

/// One live browser, driven by exactly one worker at a time.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError>;

    /// Waits until the document body exists and returns its visible text.
    async fn wait_for_body(&self, timeout: Duration) -> Result<String, ScrapeError>;

    /// Primary heading, else the document title.
    async fn heading(&self) -> Result<Option<String>, ScrapeError>;

    /// Text of the element that follows a "Location" or "Address" label.
    async fn labelled_block(&self) -> Result<Option<String>, ScrapeError>;

    async fn close(&self) -> Result<(), ScrapeError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn BrowserSession>, ScrapeError>;
}

#[derive(Default)]
struct PoolState {
    sessions: HashMap<WorkerId, Arc<dyn BrowserSession>>,
    closed: bool,
}

/// Browser sessions keyed by worker. A worker's session is started on its
/// first task and reused for every later one; nothing is shared between
/// workers. [`SessionPool::shutdown`] closes whatever is still open.
pub struct SessionPool {
    factory: Arc<dyn SessionFactory>,
    state: Mutex<PoolState>,
}

impl SessionPool {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        SessionPool {
            factory,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// The worker's session, started on demand. `None` when the browser
    /// could not be started or the pool is already shut down.
    pub async fn acquire(&self, worker: WorkerId) -> Option<Arc<dyn BrowserSession>> {
        {
            let state = self.state.lock().await;
            if state.closed {
                return None;
            }
            if let Some(session) = state.sessions.get(&worker) {
                return Some(session.clone());
            }
        }

        let session = match self.factory.create().await {
            Ok(session) => session,
            Err(e) => {
                log::error!("Error creating browser session for worker {}: {}", worker, e);
                return None;
            }
        };

        let mut state = self.state.lock().await;
        if state.closed {
            drop(state);
            close_session(worker, session).await;
            return None;
        }
        log::info!("Started browser session for worker {}", worker);
        state.sessions.insert(worker, session.clone());
        Some(session)
    }

    pub async fn live_sessions(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    pub async fn shutdown(&self) {
        let sessions: Vec<(WorkerId, Arc<dyn BrowserSession>)> = {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.sessions.drain().collect()
        };

        for (worker, session) in sessions {
            close_session(worker, session).await;
        }
    }
}

async fn close_session(worker: WorkerId, session: Arc<dyn BrowserSession>) {
    match session.close().await {
        Ok(()) => log::info!("Closed browser session for worker {}", worker),
        Err(e) => log::error!("Error closing browser session for worker {}: {}", worker, e),
    }
}
