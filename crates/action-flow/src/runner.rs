//! Workflow executor: one isolated browser session per run

use action_primitives::{BrowserSession, SessionProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::{Command, Flow};
use crate::context::ExecutionContext;
use crate::errors::FlowError;
use crate::interpreter::Interpreter;
use crate::repository::FormSource;
use crate::session_state::{domain_for, SessionStateStore};

/// Runs compiled workflows, each in a fresh session that is always closed afterwards.
pub struct WorkflowRunner {
    sessions: Arc<dyn SessionProvider>,
    interpreter: Interpreter,
    cookies: Option<Arc<SessionStateStore>>,
}

impl WorkflowRunner {
    pub fn new(sessions: Arc<dyn SessionProvider>, forms: Arc<dyn FormSource>) -> Self {
        Self {
            sessions,
            interpreter: Interpreter::new(forms),
            cookies: None,
        }
    }

    /// Restore and persist cookies per target domain.
    pub fn with_cookie_store(mut self, store: Arc<SessionStateStore>) -> Self {
        self.cookies = Some(store);
        self
    }

    pub fn persists_cookies(&self) -> bool {
        self.cookies.is_some()
    }

    /// Execute `command` and return the context as it stood at termination.
    ///
    /// The session is closed on every path, including errors and cancellation. Errors are
    /// returned after cleanup.
    pub async fn run(
        &self,
        command: &Command,
        initial: Option<ExecutionContext>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionContext, FlowError> {
        let started = Instant::now();
        let mut ctx = initial.unwrap_or_default();
        let domain = domain_for(&ctx);

        let saved = match &self.cookies {
            Some(store) => match store.load(&domain).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(domain = %domain, error = %err, "saved cookies unavailable");
                    None
                }
            },
            None => None,
        };
        if let Some(state) = &saved {
            debug!(domain = %domain, cookies = state.len(), "restoring saved cookies");
        }

        let session = self.sessions.open_session(saved).await?;
        info!(domain = %domain, "workflow started");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FlowError::Cancelled),
            result = self.interpreter.execute(command, session.driver(), &mut ctx) => result,
        };

        if !matches!(outcome, Err(FlowError::Cancelled)) {
            self.persist_cookies(session.as_ref(), &domain).await;
        }
        if let Err(err) = session.close().await {
            warn!(domain = %domain, error = %err, "session close failed");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(Flow::Terminated { success, .. }) => {
                info!(domain = %domain, success, elapsed_ms, "workflow exited");
                Ok(ctx)
            }
            Ok(Flow::Continue) => {
                info!(domain = %domain, elapsed_ms, "workflow finished without exit");
                Ok(ctx)
            }
            Err(err) => {
                error!(domain = %domain, error = %err, elapsed_ms, "workflow failed");
                Err(err)
            }
        }
    }

    async fn persist_cookies(&self, session: &dyn BrowserSession, domain: &str) {
        let Some(store) = &self.cookies else {
            return;
        };
        match session.export_cookies().await {
            Ok(state) if state.is_empty() => {}
            Ok(state) => {
                if let Err(err) = store.save(domain, &state).await {
                    warn!(domain = %domain, error = %err, "saving cookies failed");
                }
            }
            Err(err) => warn!(domain = %domain, error = %err, "exporting cookies failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::context::{JOB_URL, WORKFLOW_FINISHED_SUCCESSFULLY};
    use crate::repository::MemoryForms;
    use action_primitives::mock::{DriverScript, MockSessionProvider};
    use action_primitives::{CookieState, StoredCookie};
    use tempfile::tempdir;

    fn sid(value: &str) -> StoredCookie {
        StoredCookie {
            name: "sid".into(),
            value: value.into(),
            domain: Some("www.pracuj.pl".into()),
            path: Some("/".into()),
            expires: None,
            http_only: true,
            secure: true,
            same_site: None,
        }
    }

    fn runner(provider: Arc<MockSessionProvider>) -> WorkflowRunner {
        WorkflowRunner::new(provider, Arc::new(MemoryForms::new()))
    }

    #[tokio::test]
    async fn closes_session_after_success() {
        let provider = Arc::new(MockSessionProvider::new(DriverScript::new()));
        let command = compile(r#"{"type":"exit","success":true}"#).unwrap();

        let ctx = runner(Arc::clone(&provider))
            .run(&command, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ctx.get_bool(WORKFLOW_FINISHED_SUCCESSFULLY), Some(true));
        assert_eq!(provider.opened(), 1);
        assert_eq!(provider.closed(), 1);
    }

    #[tokio::test]
    async fn closes_session_after_failure() {
        let provider = Arc::new(MockSessionProvider::new(
            DriverScript::new().fail_interaction("#apply"),
        ));
        let command = compile(r##"{"type":"click","selector":"#apply"}"##).unwrap();

        let err = runner(Arc::clone(&provider))
            .run(&command, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::Driver(_)));
        assert_eq!(provider.closed(), 1);
    }

    #[tokio::test]
    async fn closes_session_on_cancellation() {
        let provider = Arc::new(MockSessionProvider::new(DriverScript::new()));
        let command =
            compile(r##"{"type":"click","selector":"#a","waitForTimeoutSeconds":60}"##).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = runner(Arc::clone(&provider))
            .run(&command, None, &cancel)
            .await
            .unwrap_err();

        assert_eq!(err, FlowError::Cancelled);
        assert_eq!(provider.closed(), 1);
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let provider = Arc::new(MockSessionProvider::new(DriverScript::new()).failing_to_open());
        let command = compile(r#"{"type":"exit","success":true}"#).unwrap();
        let err = runner(Arc::clone(&provider))
            .run(&command, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Driver(_)));
        assert_eq!(provider.closed(), 0);
    }

    #[tokio::test]
    async fn restores_and_saves_cookies_per_domain() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStateStore::new(dir.path()));
        store
            .save("www.pracuj.pl", &CookieState::new(vec![sid("old")]))
            .await
            .unwrap();

        let provider = Arc::new(
            MockSessionProvider::new(DriverScript::new())
                .with_exported_cookies(CookieState::new(vec![sid("new")])),
        );
        let runner = runner(Arc::clone(&provider)).with_cookie_store(Arc::clone(&store));
        let mut initial = ExecutionContext::new();
        initial.set(JOB_URL, "https://www.pracuj.pl/praca/1");
        let command = compile(r#"{"type":"exit","success":true}"#).unwrap();

        runner
            .run(&command, Some(initial), &CancellationToken::new())
            .await
            .unwrap();

        let restored = provider.restored_cookies();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].as_ref().unwrap().cookies[0].value, "old");
        let saved = store.load("www.pracuj.pl").await.unwrap().unwrap();
        assert_eq!(saved.cookies, vec![sid("new")]);
    }

    #[tokio::test]
    async fn cookies_are_not_touched_when_disabled() {
        let provider = Arc::new(MockSessionProvider::new(DriverScript::new()));
        let command = compile(r#"{"type":"exit","success":false}"#).unwrap();
        let runner = runner(Arc::clone(&provider));
        assert!(!runner.persists_cookies());
        runner
            .run(&command, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(provider.restored_cookies(), vec![None]);
    }
}
