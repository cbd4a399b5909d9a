//! Scripted in-memory driver for tests
//!
//! Pages are described up front with a [`DriverScript`]; every call is recorded so tests
//! can assert exactly what the interpreter asked the browser to do.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::DriverError,
    primitives::{AutomationDriver, BrowserSession, SessionProvider},
    types::{CookieState, WaitUntil},
};

/// A recorded driver invocation
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Navigate { url: String, wait_until: WaitUntil },
    Click { selector: String },
    WaitForLoadIdle,
    Count { selector: String },
    WaitForSelector { selector: String },
    IsVisible { selector: String },
    IsEnabled { selector: String },
    Fill { selector: String, value: String },
    SelectOption { selector: String, value: String },
    Check { selector: String },
    Uncheck { selector: String },
    SetInputFiles { selector: String, path: PathBuf },
    Screenshot { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ElementScript {
    pub count: usize,
    pub visible: bool,
    pub enabled: bool,
}

/// Static description of the page a [`ScriptedDriver`] pretends to show
#[derive(Debug, Clone, Default)]
pub struct DriverScript {
    elements: HashMap<String, ElementScript>,
    failing_selectors: HashSet<String>,
    failing_urls: Vec<String>,
    fail_screenshots: bool,
}

impl DriverScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` visible, enabled matches for `selector`
    pub fn with_element(mut self, selector: impl Into<String>, count: usize) -> Self {
        self.elements.insert(
            selector.into(),
            ElementScript {
                count,
                visible: true,
                enabled: true,
            },
        );
        self
    }

    pub fn with_hidden_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(
            selector.into(),
            ElementScript {
                count: 1,
                visible: false,
                enabled: true,
            },
        );
        self
    }

    pub fn with_disabled_element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(
            selector.into(),
            ElementScript {
                count: 1,
                visible: true,
                enabled: false,
            },
        );
        self
    }

    /// Every interaction with `selector` fails
    pub fn fail_interaction(mut self, selector: impl Into<String>) -> Self {
        self.failing_selectors.insert(selector.into());
        self
    }

    /// Navigation to any URL containing `fragment` fails
    pub fn fail_navigation(mut self, fragment: impl Into<String>) -> Self {
        self.failing_urls.push(fragment.into());
        self
    }

    pub fn fail_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    fn element(&self, selector: &str) -> Option<&ElementScript> {
        self.elements.get(selector)
    }
}

/// Driver that answers from a [`DriverScript`] and records every call
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    script: DriverScript,
    calls: Mutex<Vec<DriverCall>>,
}

impl ScriptedDriver {
    pub fn new(script: DriverScript) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    /// Selectors of every click, in order
    pub fn clicked(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Click { selector } => Some(selector.clone()),
                _ => None,
            })
            .collect()
    }

    /// URLs of every navigation, in order
    pub fn navigations(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Navigate { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().push(call);
    }

    fn interact(&self, selector: &str, call: DriverCall) -> Result<(), DriverError> {
        self.record(call);
        if self.script.failing_selectors.contains(selector) {
            return Err(DriverError::Interaction(format!(
                "scripted failure for '{selector}'"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> Result<(), DriverError> {
        self.record(DriverCall::Navigate {
            url: url.to_string(),
            wait_until,
        });
        if self
            .script
            .failing_urls
            .iter()
            .any(|fragment| url.contains(fragment.as_str()))
        {
            return Err(DriverError::Navigation(format!("net::ERR_FAILED at {url}")));
        }
        Ok(())
    }

    async fn click(&self, selector: &str, _timeout: Option<Duration>) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::Click {
                selector: selector.to_string(),
            },
        )
    }

    async fn wait_for_load_idle(&self) -> Result<(), DriverError> {
        self.record(DriverCall::WaitForLoadIdle);
        Ok(())
    }

    async fn locator_count(&self, selector: &str) -> Result<usize, DriverError> {
        self.record(DriverCall::Count {
            selector: selector.to_string(),
        });
        Ok(self.script.element(selector).map(|e| e.count).unwrap_or(0))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Option<Duration>,
    ) -> Result<bool, DriverError> {
        self.record(DriverCall::WaitForSelector {
            selector: selector.to_string(),
        });
        Ok(self
            .script
            .element(selector)
            .map(|e| e.count > 0)
            .unwrap_or(false))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError> {
        self.record(DriverCall::IsVisible {
            selector: selector.to_string(),
        });
        Ok(self
            .script
            .element(selector)
            .map(|e| e.count > 0 && e.visible)
            .unwrap_or(false))
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, DriverError> {
        self.record(DriverCall::IsEnabled {
            selector: selector.to_string(),
        });
        Ok(self
            .script
            .element(selector)
            .map(|e| e.count > 0 && e.enabled)
            .unwrap_or(false))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::Fill {
                selector: selector.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::SelectOption {
                selector: selector.to_string(),
                value: value.to_string(),
            },
        )
    }

    async fn check(&self, selector: &str) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::Check {
                selector: selector.to_string(),
            },
        )
    }

    async fn uncheck(&self, selector: &str) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::Uncheck {
                selector: selector.to_string(),
            },
        )
    }

    async fn set_input_files(&self, selector: &str, path: &Path) -> Result<(), DriverError> {
        self.interact(
            selector,
            DriverCall::SetInputFiles {
                selector: selector.to_string(),
                path: path.to_path_buf(),
            },
        )
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<(), DriverError> {
        self.record(DriverCall::Screenshot {
            path: path.to_path_buf(),
        });
        if self.script.fail_screenshots {
            return Err(DriverError::Io(format!(
                "scripted screenshot failure for {}",
                path.display()
            )));
        }
        Ok(())
    }
}

/// Session handed out by [`MockSessionProvider`]
pub struct MockSession {
    driver: Arc<ScriptedDriver>,
    cookies: CookieState,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for MockSession {
    fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    async fn export_cookies(&self) -> Result<CookieState, DriverError> {
        Ok(self.cookies.clone())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Provider of scripted sessions that tracks the session lifecycle
#[derive(Default)]
pub struct MockSessionProvider {
    script: DriverScript,
    exported: CookieState,
    fail_open: bool,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    drivers: Mutex<Vec<Arc<ScriptedDriver>>>,
    restored: Mutex<Vec<Option<CookieState>>>,
}

impl MockSessionProvider {
    pub fn new(script: DriverScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Cookies every session reports from `export_cookies`
    pub fn with_exported_cookies(mut self, cookies: CookieState) -> Self {
        self.exported = cookies;
        self
    }

    pub fn failing_to_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drivers of every session opened so far, in opening order
    pub fn drivers(&self) -> Vec<Arc<ScriptedDriver>> {
        self.drivers.lock().clone()
    }

    /// Cookie state passed to each `open_session` call, in order
    pub fn restored_cookies(&self) -> Vec<Option<CookieState>> {
        self.restored.lock().clone()
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn open_session(
        &self,
        cookies: Option<CookieState>,
    ) -> Result<Box<dyn BrowserSession>, DriverError> {
        self.restored.lock().push(cookies);
        if self.fail_open {
            return Err(DriverError::Session("scripted launch failure".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let driver = Arc::new(ScriptedDriver::new(self.script.clone()));
        self.drivers.lock().push(Arc::clone(&driver));
        Ok(Box::new(MockSession {
            driver,
            cookies: self.exported.clone(),
            closed: Arc::clone(&self.closed),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_counts_and_failures() {
        let driver = ScriptedDriver::new(
            DriverScript::new()
                .with_element("#apply", 2)
                .fail_interaction("#broken")
                .fail_navigation("offline.test"),
        );

        assert_eq!(driver.locator_count("#apply").await.unwrap(), 2);
        assert_eq!(driver.locator_count("#missing").await.unwrap(), 0);
        assert!(driver.click("#broken", None).await.is_err());
        assert!(driver
            .navigate("https://offline.test/job", WaitUntil::Load)
            .await
            .is_err());
        assert_eq!(driver.clicked(), vec!["#broken".to_string()]);
    }

    #[tokio::test]
    async fn provider_tracks_lifecycle() {
        let provider = MockSessionProvider::new(DriverScript::new());
        let session = provider.open_session(None).await.unwrap();
        assert_eq!(provider.opened(), 1);
        session.close().await.unwrap();
        assert_eq!(provider.closed(), 1);
        assert_eq!(provider.restored_cookies(), vec![None]);
    }
}
