use std::path::Path;
use std::time::Duration;

use action_primitives::{BrowserSession, CookieState, DriverError, SessionProvider};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetCookiesParams;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CdpConfig;
use crate::cookies;
use crate::session::{ChromiumDriver, ChromiumSession};

/// Launches one dedicated Chromium per session.
#[derive(Clone, Debug)]
pub struct ChromiumSessionProvider {
    cfg: CdpConfig,
}

impl ChromiumSessionProvider {
    pub fn new(cfg: CdpConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }
}

fn browser_config(cfg: &CdpConfig, profile_dir: &Path) -> Result<BrowserConfig, DriverError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(DriverError::Session(format!(
            "chrome executable not found at {}; set AUTOAPPLY_CHROME to the full path of chrome/chromium",
            cfg.executable.display()
        )));
    }

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_timeout_ms))
        .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms));

    if !cfg.headless {
        builder = builder.with_head();
    }
    if cfg.no_sandbox {
        builder = builder.no_sandbox();
    }

    let mut args: Vec<String> = [
        "--disable-background-networking",
        "--disable-breakpad",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--use-mock-keychain",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    if cfg.headless {
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    }
    if let Some(agent) = cfg.user_agent.as_deref().filter(|a| !a.trim().is_empty()) {
        args.push(format!("--user-agent={agent}"));
    }
    args.extend(cfg.extra_args.iter().cloned());
    builder = builder.args(args);

    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }
    builder = builder.user_data_dir(profile_dir);

    builder
        .build()
        .map_err(|err| DriverError::Session(format!("browser config error: {err}")))
}

async fn discard_browser(mut browser: Browser, profile_dir: &Path) {
    if let Err(err) = browser.close().await {
        debug!(error = %err, "close after failed setup");
    }
    let _ = browser.wait().await;
    let _ = tokio::fs::remove_dir_all(profile_dir).await;
}

#[async_trait]
impl SessionProvider for ChromiumSessionProvider {
    async fn open_session(
        &self,
        cookies: Option<CookieState>,
    ) -> Result<Box<dyn BrowserSession>, DriverError> {
        let id = Uuid::new_v4();
        let profile_dir = self.cfg.profile_root.join(format!("session-{id}"));
        tokio::fs::create_dir_all(&profile_dir).await?;

        let config = browser_config(&self.cfg, &profile_dir)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| DriverError::Session(format!("failed to launch chromium: {err}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(session = %id, error = %err, "cdp handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler_task.abort();
                discard_browser(browser, &profile_dir).await;
                return Err(DriverError::Session(format!("failed to open page: {err}")));
            }
        };

        if let Some(state) = cookies.filter(|state| !state.is_empty()) {
            let params = cookies::restore_params(&state);
            let restored = params.len();
            if let Err(err) = page.execute(SetCookiesParams::new(params)).await {
                warn!(session = %id, error = %err, "restoring saved cookies failed");
            } else {
                debug!(session = %id, restored, "saved cookies restored");
            }
        }

        let driver = ChromiumDriver::new(
            page,
            Duration::from_millis(self.cfg.default_timeout_ms),
            Duration::from_millis(self.cfg.idle_window_ms),
        );
        info!(session = %id, headless = self.cfg.headless, "browser session opened");
        Ok(Box::new(ChromiumSession::new(
            id,
            driver,
            browser,
            handler_task,
            profile_dir,
        )))
    }
}
