use std::time::{Duration, Instant};

use crate::{
    configuration::ScraperSettings,
    domain::{extractor::ContactDetails, record::ScrapedRecord},
};

use super::session_pool::{BrowserSession, ScrapeError};

pub const BLANK_PAGE: &str = "about:blank";

const RESET_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PageScraper {
    ready_timeout: Duration,
    navigation_timeout: Duration,
}

impl PageScraper {
    pub fn new(ready_timeout: Duration, navigation_timeout: Duration) -> Self {
        PageScraper {
            ready_timeout,
            navigation_timeout,
        }
    }

    pub fn from_settings(settings: &ScraperSettings) -> Self {
        Self::new(settings.ready_timeout(), settings.navigation_timeout())
    }

    /// Scrapes one page. Any failure is logged and comes back as `None`.
    /// The session is always parked on a blank page afterwards.
    pub async fn scrape(&self, url: &str, session: &dyn BrowserSession) -> Option<ScrapedRecord> {
        let started = Instant::now();
        let outcome = self.read_page(url, session).await;

        match tokio::time::timeout(RESET_TIMEOUT, session.goto(BLANK_PAGE)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to reset browser after {}: {}", url, e),
            Err(_) => log::warn!("Timed out resetting browser after {}", url),
        }

        match outcome {
            Ok(record) => Some(record.with_scrape_time(started.elapsed().as_secs_f64())),
            Err(e) => {
                log::error!("Error scraping {}: {}", url, e);
                None
            }
        }
    }

    async fn read_page(
        &self,
        url: &str,
        session: &dyn BrowserSession,
    ) -> Result<ScrapedRecord, ScrapeError> {
        tokio::time::timeout(self.navigation_timeout, session.goto(url))
            .await
            .map_err(|_| ScrapeError::Timeout(self.navigation_timeout, "navigation"))??;

        let page_text = session.wait_for_body(self.ready_timeout).await?;

        let name = match session.heading().await {
            Ok(Some(heading)) => heading,
            Ok(None) => name_from_url(url),
            Err(e) => {
                log::warn!("No heading on {}: {}", url, e);
                name_from_url(url)
            }
        };

        let details = ContactDetails::from_text(&page_text);
        let record = ScrapedRecord::from_contact_details(url, &name, details);

        let record = match session.labelled_block().await {
            Ok(Some(address)) => record.with_address(&address),
            Ok(None) => record,
            Err(e) => {
                log::debug!("No address block on {}: {}", url, e);
                record
            }
        };

        Ok(record)
    }
}

fn name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}
