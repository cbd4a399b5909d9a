//! Driver traits
//!
//! The interpreter only ever talks to a page through [`AutomationDriver`]. A
//! [`SessionProvider`] hands out isolated [`BrowserSession`]s, each owning exactly one
//! browser and one page for the lifetime of a workflow run.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    errors::DriverError,
    types::{CookieState, WaitUntil},
};

/// Page-level browser operations
///
/// Selectors are CSS selectors. Methods that accept an optional timeout fall back to the
/// driver's configured default when `None` is given.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Navigate the page and block until `wait_until` is satisfied
    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> Result<(), DriverError>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str, timeout: Option<Duration>) -> Result<(), DriverError>;

    /// Wait until the page has settled and the network is quiet
    async fn wait_for_load_idle(&self) -> Result<(), DriverError>;

    /// Number of elements currently matching `selector`
    async fn locator_count(&self, selector: &str) -> Result<usize, DriverError>;

    /// Wait for `selector` to match; `Ok(false)` when the timeout elapsed first
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<bool, DriverError>;

    /// Whether the first match is rendered and visible
    async fn is_visible(&self, selector: &str) -> Result<bool, DriverError>;

    /// Whether the first match accepts input
    async fn is_enabled(&self, selector: &str) -> Result<bool, DriverError>;

    /// Replace the value of an input-like element
    async fn fill(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Choose the option whose value (or label) equals `value`
    async fn select_option(&self, selector: &str, value: &str) -> Result<(), DriverError>;

    async fn check(&self, selector: &str) -> Result<(), DriverError>;

    async fn uncheck(&self, selector: &str) -> Result<(), DriverError>;

    /// Attach a local file to a file input
    async fn set_input_files(&self, selector: &str, path: &Path) -> Result<(), DriverError>;

    /// Capture the page as PNG into `path`
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), DriverError>;
}

/// One isolated browser instance with a single page
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Page operations for this session
    fn driver(&self) -> &dyn AutomationDriver;

    /// Snapshot of the cookies currently held by the browser
    async fn export_cookies(&self) -> Result<CookieState, DriverError>;

    /// Release the browser. Must be called exactly once per session.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Factory for isolated browser sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a fresh session, restoring `cookies` into it when given
    async fn open_session(
        &self,
        cookies: Option<CookieState>,
    ) -> Result<Box<dyn BrowserSession>, DriverError>;
}

#[async_trait]
impl<P> SessionProvider for Arc<P>
where
    P: SessionProvider + ?Sized,
{
    async fn open_session(
        &self,
        cookies: Option<CookieState>,
    ) -> Result<Box<dyn BrowserSession>, DriverError> {
        (**self).open_session(cookies).await
    }
}
