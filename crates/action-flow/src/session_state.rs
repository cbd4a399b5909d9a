//! Per-domain persisted cookie state
//!
//! One JSON file per target domain under the cookie directory. Reads and
//! read-merge-writes of a domain's file happen under that domain's async lock so
//! concurrent jobs on the same site never lose each other's cookies. Expired cookies
//! are dropped on every load and save.

use action_primitives::{CookieState, StoredCookie};
use chrono::Utc;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use url::Url;

use crate::context::{ExecutionContext, JOB_URL};
use crate::errors::FlowError;

/// Bucket used when the run has no usable `JobUrl`.
pub const DEFAULT_DOMAIN: &str = "default";

/// Cookie bucket for a run: the host of `JobUrl`, or [`DEFAULT_DOMAIN`].
pub fn domain_for(ctx: &ExecutionContext) -> String {
    ctx.get_str(JOB_URL)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| match Url::parse(raw) {
            Ok(url) => url.host_str().map(|host| host.to_ascii_lowercase()),
            Err(err) => {
                warn!(url = %raw, error = %err, "cannot derive cookie domain from job url");
                None
            }
        })
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
}

pub struct SessionStateStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    /// `{dir}/{domain}.json`, with characters unsafe in file names replaced.
    pub fn path_for(&self, domain: &str) -> PathBuf {
        let file: String = domain
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    async fn lock(&self, domain: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Saved state for `domain`; `None` when nothing usable is stored.
    pub async fn load(&self, domain: &str) -> Result<Option<CookieState>, FlowError> {
        let _guard = self.lock(domain).await;
        let now = unix_now();
        Ok(self.read(domain).await?.map(|state| {
            CookieState::new(
                state
                    .cookies
                    .into_iter()
                    .filter(|cookie| !cookie.expired_at(now))
                    .collect(),
            )
        }))
    }

    async fn read(&self, domain: &str) -> Result<Option<CookieState>, FlowError> {
        let path = self.path_for(domain);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(FlowError::Io(format!("{}: {err}", path.display()))),
        };
        match serde_json::from_str::<CookieState>(&text) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable cookie file");
                Ok(None)
            }
        }
    }

    /// Merge `fresh` over the stored state and write it back atomically.
    pub async fn save(&self, domain: &str, fresh: &CookieState) -> Result<(), FlowError> {
        let _guard = self.lock(domain).await;
        let existing = self.read(domain).await?.unwrap_or_default();
        let merged = merge(existing, fresh, unix_now());

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(domain);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(&merged)
            .map_err(|err| FlowError::Io(format!("serialize cookies: {err}")))?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(domain = %domain, cookies = merged.len(), "cookie state saved");
        Ok(())
    }
}

fn cookie_key(cookie: &StoredCookie) -> (String, Option<String>, Option<String>) {
    (
        cookie.name.clone(),
        cookie.domain.clone(),
        cookie.path.clone(),
    )
}

fn unix_now() -> f64 {
    Utc::now().timestamp() as f64
}

/// Fresh cookies replace stored ones with the same name, domain and path; expired
/// cookies from either side are dropped.
fn merge(existing: CookieState, fresh: &CookieState, now: f64) -> CookieState {
    let mut cookies: Vec<StoredCookie> = existing
        .cookies
        .into_iter()
        .filter(|old| {
            !fresh
                .cookies
                .iter()
                .any(|new| cookie_key(new) == cookie_key(old))
        })
        .collect();
    cookies.extend(fresh.cookies.iter().cloned());
    cookies.retain(|cookie| !cookie.expired_at(now));
    CookieState::new(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cookie(name: &str, value: &str) -> StoredCookie {
        StoredCookie {
            name: name.into(),
            value: value.into(),
            domain: Some("www.pracuj.pl".into()),
            path: Some("/".into()),
            expires: None,
            http_only: false,
            secure: true,
            same_site: None,
        }
    }

    #[test]
    fn domain_comes_from_job_url() {
        let mut ctx = ExecutionContext::new();
        assert_eq!(domain_for(&ctx), DEFAULT_DOMAIN);
        ctx.set(JOB_URL, "not a url");
        assert_eq!(domain_for(&ctx), DEFAULT_DOMAIN);
        ctx.set(JOB_URL, "https://WWW.Pracuj.pl/praca/123");
        assert_eq!(domain_for(&ctx), "www.pracuj.pl");
    }

    #[test]
    fn file_names_are_sanitised() {
        let store = SessionStateStore::new("/cookies");
        assert_eq!(
            store.path_for("[::1]"),
            PathBuf::from("/cookies/___1_.json")
        );
        assert_eq!(
            store.path_for("indeed.com"),
            PathBuf::from("/cookies/indeed.com.json")
        );
    }

    #[tokio::test]
    async fn save_merges_with_existing_state() {
        let dir = tempdir().unwrap();
        let store = SessionStateStore::new(dir.path());
        assert_eq!(store.load("www.pracuj.pl").await.unwrap(), None);

        store
            .save(
                "www.pracuj.pl",
                &CookieState::new(vec![cookie("a", "1"), cookie("b", "1")]),
            )
            .await
            .unwrap();
        store
            .save("www.pracuj.pl", &CookieState::new(vec![cookie("b", "2")]))
            .await
            .unwrap();

        let state = store.load("www.pracuj.pl").await.unwrap().unwrap();
        let mut values: Vec<_> = state
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        values.sort();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn expired_cookies_are_not_kept() {
        let dir = tempdir().unwrap();
        let store = SessionStateStore::new(dir.path());
        let soon = unix_now() + 2.0;
        let mut short_lived = cookie("short", "1");
        short_lived.expires = Some(soon);
        let mut long_lived = cookie("long", "1");
        long_lived.expires = Some(soon + 3600.0);

        std::fs::write(
            store.path_for("www.pracuj.pl"),
            serde_json::to_vec(&CookieState::new(vec![short_lived, long_lived])).unwrap(),
        )
        .unwrap();
        assert_eq!(store.load("www.pracuj.pl").await.unwrap().unwrap().len(), 2);

        let mut gone = cookie("gone", "");
        gone.expires = Some(1.0);
        let later = merge(
            store.read("www.pracuj.pl").await.unwrap().unwrap(),
            &CookieState::new(vec![gone, cookie("session", "x")]),
            soon + 1.0,
        );
        let mut names: Vec<_> = later.cookies.iter().map(|c| c.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["long", "session"]);
    }

    #[test]
    fn session_cookies_never_expire() {
        let mut session = cookie("sid", "1");
        assert!(!session.expired_at(f64::MAX));
        session.expires = Some(-1.0);
        assert!(!session.expired_at(f64::MAX));
        session.expires = Some(10.0);
        assert!(session.expired_at(10.0));
        assert!(!session.expired_at(9.0));
    }

    #[tokio::test]
    async fn corrupt_files_are_ignored() {
        let dir = tempdir().unwrap();
        let store = SessionStateStore::new(dir.path());
        std::fs::write(store.path_for("indeed.com"), "{oops").unwrap();
        assert_eq!(store.load("indeed.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn concurrent_saves_keep_every_cookie() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SessionStateStore::new(dir.path()));
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .save(
                            "www.pracuj.pl",
                            &CookieState::new(vec![cookie(&format!("c{i}"), "v")]),
                        )
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        let state = store.load("www.pracuj.pl").await.unwrap().unwrap();
        assert_eq!(state.len(), 6);
    }
}
