//! JSON-file job store
//!
//! The whole backlog lives in one JSON array. Every mutation reads the file,
//! applies the change and replaces the file through a temp file + rename while
//! holding the store lock, so a committed job and its attempts land together.

use async_trait::async_trait;
use autoapply_scheduler::{
    select_pending, ApplicationAttempt, AttemptStatus, Job, JobId, JobStore, StoreError,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub struct JsonFileJobStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileJobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<Job>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|err| {
                StoreError::Corrupt(format!("{}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(StoreError::Io(format!("{}: {err}", self.path.display()))),
        }
    }

    async fn write_all(&self, jobs: &[Job]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(jobs)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), jobs = jobs.len(), "job store written");
        Ok(())
    }
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn pending(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let _guard = self.lock.lock().await;
        let jobs = self.read_all().await?;
        Ok(select_pending(&jobs, limit))
    }

    async fn commit(&self, job: &Job) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_all().await?;
        let slot = jobs
            .iter_mut()
            .find(|stored| stored.id == job.id)
            .ok_or(StoreError::NotFound(job.id))?;
        *slot = job.clone();
        self.write_all(&jobs).await
    }

    async fn record_attempt(
        &self,
        id: JobId,
        attempt: ApplicationAttempt,
    ) -> Result<AttemptStatus, StoreError> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_all().await?;
        let job = jobs
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let status = job.record_attempt(attempt);
        self.write_all(&jobs).await?;
        Ok(status)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|job| job.id == id))
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_all().await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut jobs = self.read_all().await?;
        if jobs.iter().any(|stored| stored.id == job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        jobs.push(job);
        self.write_all(&jobs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_file_is_an_empty_backlog() {
        let dir = tempdir().unwrap();
        let store = JsonFileJobStore::new(dir.path().join("jobs.json"));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.pending(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_persists_job_with_attempts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("jobs.json");
        let store = JsonFileJobStore::new(&path);
        let mut job = Job::new("https://indeed.com/viewjob?jk=1", "Dev");
        store.insert(job.clone()).await.unwrap();

        job.should_apply = false;
        job.attempts.push(ApplicationAttempt {
            timestamp: Utc::now(),
            status: AttemptStatus::Failure,
            error_message: Some("timeout".into()),
        });
        store.commit(&job).await.unwrap();

        let reopened = JsonFileJobStore::new(&path);
        let stored = reopened.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored, job);
        assert!(reopened.pending(5).await.unwrap().is_empty());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn recorded_attempt_keeps_a_concurrent_review() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let store = JsonFileJobStore::new(&path);
        let job = Job::new("https://indeed.com/viewjob?jk=1", "Dev");
        store.insert(job.clone()).await.unwrap();

        // Marked applied by hand while the workflow was still running.
        let mut reviewed = job.clone();
        reviewed.is_applied = true;
        store.commit(&reviewed).await.unwrap();

        let status = store
            .record_attempt(
                job.id,
                ApplicationAttempt {
                    timestamp: Utc::now(),
                    status: AttemptStatus::Failure,
                    error_message: Some("timeout".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(status, AttemptStatus::Failure);

        let stored = JsonFileJobStore::new(&path).get(job.id).await.unwrap().unwrap();
        assert!(stored.is_applied && !stored.should_apply);
        assert_eq!(stored.attempts.len(), 1);
    }

    #[tokio::test]
    async fn unknown_and_duplicate_jobs_are_rejected() {
        let dir = tempdir().unwrap();
        let store = JsonFileJobStore::new(dir.path().join("jobs.json"));
        let job = Job::new("https://indeed.com/viewjob?jk=1", "Dev");
        assert_eq!(store.commit(&job).await, Err(StoreError::NotFound(job.id)));
        store.insert(job.clone()).await.unwrap();
        assert_eq!(
            store.insert(job.clone()).await,
            Err(StoreError::Duplicate(job.id))
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, "[{").unwrap();
        let store = JsonFileJobStore::new(&path);
        assert!(matches!(store.list().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn concurrent_commits_do_not_lose_updates() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileJobStore::new(dir.path().join("jobs.json")));
        let mut jobs = Vec::new();
        for i in 0..5 {
            let job = Job::new(format!("https://indeed.com/viewjob?jk={i}"), "Dev");
            store.insert(job.clone()).await.unwrap();
            jobs.push(job);
        }

        let handles: Vec<_> = jobs
            .into_iter()
            .map(|mut job| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    job.should_apply = false;
                    job.is_applied = true;
                    store.commit(&job).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(store.list().await.unwrap().iter().all(|job| job.is_applied));
    }
}
