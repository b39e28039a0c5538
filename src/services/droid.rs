use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::json;
use thirtyfour::{
    extensions::cdp::ChromeDevTools, prelude::*, ChromiumLikeCapabilities, DesiredCapabilities,
    WebDriver,
};
use tokio::sync::Mutex;

use super::session_pool::{BrowserSession, ScrapeError, SessionFactory};

const USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const HIDE_WEBDRIVER_SCRIPT: &str =
    r#"Object.defineProperty(navigator, "webdriver", {get: () => undefined})"#;

const HEADING_XPATH: &str = "//h1";
const LABELLED_BLOCK_XPATH: &str =
    "//div[contains(text(), 'Location') or contains(text(), 'Address')]/following-sibling::div";
const BODY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A headless Chrome driven over WebDriver.
pub struct Droid {
    driver: Mutex<Option<WebDriver>>,
}

impl Droid {
    pub async fn new(webdriver_url: &str) -> Result<Self, ScrapeError> {
        let caps = build_capabilities()?;
        let driver = WebDriver::new(webdriver_url, caps)
            .await
            .map_err(|e| ScrapeError::SessionStart(e.to_string()))?;

        // Runs before any page script so `navigator.webdriver` reads as unset
        let dev_tools = ChromeDevTools::new(driver.handle.clone());
        if let Err(e) = dev_tools
            .execute_cdp_with_params(
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": HIDE_WEBDRIVER_SCRIPT }),
            )
            .await
        {
            if let Err(quit_err) = driver.quit().await {
                log::error!("Error quitting half-started browser: {}", quit_err);
            }
            return Err(ScrapeError::SessionStart(e.to_string()));
        }

        Ok(Droid {
            driver: Mutex::new(Some(driver)),
        })
    }
}

fn build_capabilities() -> Result<thirtyfour::ChromeCapabilities, ScrapeError> {
    let mut caps = DesiredCapabilities::chrome();
    let user_agent = USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0]);

    let configure = |caps: &mut thirtyfour::ChromeCapabilities| -> WebDriverResult<()> {
        caps.set_headless()?;
        caps.set_no_sandbox()?;
        caps.set_disable_dev_shm_usage()?;
        caps.set_disable_gpu()?;
        caps.add_arg("--window-size=1920,1080")?;
        caps.add_arg(&format!("--user-agent={}", user_agent))?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        caps.add_experimental_option(
            "excludeSwitches",
            vec!["enable-logging", "enable-automation"],
        )?;
        caps.add_experimental_option("useAutomationExtension", false)?;
        Ok(())
    };
    configure(&mut caps).map_err(|e| ScrapeError::SessionStart(e.to_string()))?;

    Ok(caps)
}

fn first_non_empty(text: String) -> Option<String> {
    let text = text.trim();
    match text.is_empty() {
        true => None,
        false => Some(text.to_string()),
    }
}

#[async_trait]
impl BrowserSession for Droid {
    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(ScrapeError::SessionClosed)?;
        driver.goto(url).await?;
        Ok(())
    }

    async fn wait_for_body(&self, timeout: Duration) -> Result<String, ScrapeError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(ScrapeError::SessionClosed)?;

        let body = driver
            .query(By::Tag("body"))
            .wait(timeout, BODY_POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| ScrapeError::Timeout(timeout, "document body"))?;

        Ok(body.text().await?)
    }

    async fn heading(&self) -> Result<Option<String>, ScrapeError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(ScrapeError::SessionClosed)?;

        if let Some(h1) = driver.find_all(By::XPath(HEADING_XPATH)).await?.first() {
            if let Some(text) = first_non_empty(h1.text().await?) {
                return Ok(Some(text));
            }
        }

        Ok(first_non_empty(driver.title().await?))
    }

    async fn labelled_block(&self) -> Result<Option<String>, ScrapeError> {
        let guard = self.driver.lock().await;
        let driver = guard.as_ref().ok_or(ScrapeError::SessionClosed)?;

        match driver.find_all(By::XPath(LABELLED_BLOCK_XPATH)).await?.first() {
            Some(element) => Ok(first_non_empty(element.text().await?)),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        let driver = self.driver.lock().await.take();
        match driver {
            Some(driver) => Ok(driver.quit().await?),
            None => Ok(()),
        }
    }
}

/// Starts a fresh [`Droid`] against a WebDriver endpoint.
pub struct DroidFactory {
    webdriver_url: String,
}

impl DroidFactory {
    pub fn new(webdriver_url: &str) -> Self {
        DroidFactory {
            webdriver_url: webdriver_url.to_string(),
        }
    }
}

#[async_trait]
impl SessionFactory for DroidFactory {
    async fn create(&self) -> Result<Arc<dyn BrowserSession>, ScrapeError> {
        let droid = Droid::new(&self.webdriver_url).await?;
        Ok(Arc::new(droid))
    }
}
