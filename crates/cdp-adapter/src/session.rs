use std::path::{Path, PathBuf};
use std::time::Duration;

use action_primitives::{
    AutomationDriver, BrowserSession, CookieState, DriverError, WaitUntil,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{cookies, scripts};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Page operations over one chromiumoxide page.
#[derive(Clone)]
pub struct ChromiumDriver {
    page: Page,
    default_timeout: Duration,
    idle_window: Duration,
}

impl ChromiumDriver {
    pub(crate) fn new(page: Page, default_timeout: Duration, idle_window: Duration) -> Self {
        Self {
            page,
            default_timeout,
            idle_window,
        }
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| DriverError::Protocol(format!("evaluate failed: {err}")))?;
        result
            .into_value::<T>()
            .map_err(|err| DriverError::Protocol(format!("unexpected script result: {err}")))
    }

    async fn run_mutation(&self, script: String, selector: &str) -> Result<(), DriverError> {
        let status: String = self.eval(script).await?;
        match status.as_str() {
            scripts::STATUS_OK => Ok(()),
            scripts::STATUS_MISSING => Err(DriverError::SelectorNotFound(selector.to_string())),
            other => Err(DriverError::Interaction(format!("{selector}: {other}"))),
        }
    }

    async fn ready_state(&self) -> Result<String, DriverError> {
        self.eval(scripts::READY_STATE.to_string()).await
    }

    async fn wait_for_ready_state(
        &self,
        accept: &[&str],
        deadline: Instant,
    ) -> Result<(), DriverError> {
        loop {
            let state = self.ready_state().await?;
            if accept.contains(&state.as_str()) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "document.readyState stuck at '{state}'"
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until `selector` resolves to an element or `deadline` passes.
    async fn resolve_element(
        &self,
        selector: &str,
        deadline: Instant,
    ) -> Result<Element, DriverError> {
        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(err) if Instant::now() >= deadline => {
                    debug!(selector = %selector, error = %err, "element lookup gave up");
                    return Err(DriverError::SelectorNotFound(selector.to_string()));
                }
                Err(_) => sleep(POLL_INTERVAL).await,
            }
        }
    }

    fn deadline(&self, timeout: Option<Duration>) -> Instant {
        Instant::now() + timeout.unwrap_or(self.default_timeout)
    }
}

#[async_trait]
impl AutomationDriver for ChromiumDriver {
    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> Result<(), DriverError> {
        let deadline = self.deadline(None);
        let goto = tokio::time::timeout(self.default_timeout, self.page.goto(url)).await;
        match goto {
            Err(_) => {
                return Err(DriverError::Timeout(format!(
                    "navigation to {url} exceeded {}ms",
                    self.default_timeout.as_millis()
                )))
            }
            Ok(Err(err)) => return Err(DriverError::Navigation(format!("{url}: {err}"))),
            Ok(Ok(_)) => {}
        }

        match wait_until {
            WaitUntil::Load => self.wait_for_ready_state(&["complete"], deadline).await,
            WaitUntil::DomContentLoaded => {
                self.wait_for_ready_state(&["interactive", "complete"], deadline)
                    .await
            }
            WaitUntil::NetworkIdle => self.wait_for_load_idle().await,
        }
    }

    async fn click(&self, selector: &str, timeout: Option<Duration>) -> Result<(), DriverError> {
        let element = self.resolve_element(selector, self.deadline(timeout)).await?;
        element
            .click()
            .await
            .map_err(|err| DriverError::Interaction(format!("click {selector}: {err}")))?;
        Ok(())
    }

    async fn wait_for_load_idle(&self) -> Result<(), DriverError> {
        let deadline = self.deadline(None);
        self.wait_for_ready_state(&["complete"], deadline).await?;

        let mut last_count: u64 = self.eval(scripts::RESOURCE_COUNT.to_string()).await?;
        let mut quiet_since = Instant::now();
        loop {
            if quiet_since.elapsed() >= self.idle_window {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout("network never went idle".to_string()));
            }
            sleep(POLL_INTERVAL).await;
            let count: u64 = self.eval(scripts::RESOURCE_COUNT.to_string()).await?;
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            }
        }
    }

    async fn locator_count(&self, selector: &str) -> Result<usize, DriverError> {
        self.eval(scripts::count(selector)).await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<bool, DriverError> {
        let deadline = self.deadline(timeout);
        loop {
            if self.locator_count(selector).await? > 0 {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError> {
        self.eval(scripts::is_visible(selector)).await
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, DriverError> {
        self.eval(scripts::is_enabled(selector)).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.run_mutation(scripts::fill(selector, value), selector)
            .await
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.run_mutation(scripts::select_option(selector, value), selector)
            .await
    }

    async fn check(&self, selector: &str) -> Result<(), DriverError> {
        self.run_mutation(scripts::set_checked(selector, true), selector)
            .await
    }

    async fn uncheck(&self, selector: &str) -> Result<(), DriverError> {
        self.run_mutation(scripts::set_checked(selector, false), selector)
            .await
    }

    async fn set_input_files(&self, selector: &str, path: &Path) -> Result<(), DriverError> {
        let absolute = tokio::fs::canonicalize(path).await?;
        let element = self.resolve_element(selector, self.deadline(None)).await?;
        let mut params = SetFileInputFilesParams::new(vec![absolute.to_string_lossy().into_owned()]);
        params.backend_node_id = Some(element.backend_node_id);
        self.page
            .execute(params)
            .await
            .map_err(|err| DriverError::Interaction(format!("upload into {selector}: {err}")))?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), DriverError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(full_page).build(), path)
            .await
            .map_err(|err| DriverError::Io(format!("screenshot {}: {err}", path.display())))?;
        Ok(())
    }
}

/// One launched Chromium with a single page.
pub struct ChromiumSession {
    id: Uuid,
    driver: ChromiumDriver,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    pub(crate) fn new(
        id: Uuid,
        driver: ChromiumDriver,
        browser: Browser,
        handler: JoinHandle<()>,
        profile_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            driver,
            browser: Mutex::new(Some(browser)),
            handler,
            profile_dir,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn driver(&self) -> &dyn AutomationDriver {
        &self.driver
    }

    async fn export_cookies(&self) -> Result<CookieState, DriverError> {
        let cookies = self
            .driver
            .page
            .get_cookies()
            .await
            .map_err(|err| DriverError::Protocol(format!("get cookies: {err}")))?;
        Ok(cookies::export(cookies))
    }

    async fn close(&self) -> Result<(), DriverError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let mut outcome = Ok(());
        if let Err(err) = browser.close().await {
            warn!(session = %self.id, error = %err, "browser close command failed");
            outcome = Err(DriverError::Session(format!("close failed: {err}")));
        }
        if let Err(err) = browser.wait().await {
            warn!(session = %self.id, error = %err, "waiting for browser exit failed");
        }
        self.handler.abort();

        if let Err(err) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            debug!(session = %self.id, error = %err, "profile directory not removed");
        }
        info!(session = %self.id, "browser session closed");
        outcome
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // chromiumoxide kills an unclosed child process when the Browser drops.
        self.handler.abort();
    }
}
