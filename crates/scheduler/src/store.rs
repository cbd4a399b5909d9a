//! Job persistence seam

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::model::{ApplicationAttempt, AttemptStatus, Job, JobId};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Up to `limit` jobs with `should_apply && !is_applied`, oldest first.
    async fn pending(&self, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Replace the stored job, attempts included, as one unit.
    async fn commit(&self, job: &Job) -> Result<(), StoreError>;

    /// Apply `attempt` to the job as currently stored and persist it as one unit.
    ///
    /// Changes made to the job while its workflow ran are kept; see
    /// [`Job::record_attempt`].
    async fn record_attempt(
        &self,
        id: JobId,
        attempt: ApplicationAttempt,
    ) -> Result<AttemptStatus, StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    async fn list(&self) -> Result<Vec<Job>, StoreError>;

    async fn insert(&self, job: Job) -> Result<(), StoreError>;
}

/// Oldest-created-first pending selection shared by store implementations.
pub fn select_pending<'a>(jobs: impl IntoIterator<Item = &'a Job>, limit: usize) -> Vec<Job> {
    let mut pending: Vec<&Job> = jobs.into_iter().filter(|job| job.is_pending()).collect();
    pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    pending.into_iter().take(limit).cloned().collect()
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.jobs.write();
            for job in jobs {
                guard.insert(job.id, job);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn pending(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        Ok(select_pending(self.jobs.read().values(), limit))
    }

    async fn commit(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write();
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(job.id)),
        }
    }

    async fn record_attempt(
        &self,
        id: JobId,
        attempt: ApplicationAttempt,
    ) -> Result<AttemptStatus, StoreError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(job.record_attempt(attempt))
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.jobs.read().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        jobs.insert(job.id, job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn aged(title: &str, minutes_ago: i64) -> Job {
        let mut job = Job::new(format!("https://indeed.com/{title}"), title);
        job.created_at = Utc::now() - Duration::minutes(minutes_ago);
        job
    }

    #[tokio::test]
    async fn pending_is_oldest_first_and_bounded() {
        let mut applied = aged("applied", 50);
        applied.is_applied = true;
        let mut disarmed = aged("disarmed", 40);
        disarmed.should_apply = false;
        let store = InMemoryJobStore::with_jobs(vec![
            aged("new", 1),
            applied,
            aged("old", 30),
            disarmed,
            aged("mid", 10),
        ]);

        let titles: Vec<_> = store
            .pending(2)
            .await
            .unwrap()
            .into_iter()
            .map(|job| job.title)
            .collect();
        assert_eq!(titles, vec!["old", "mid"]);
        assert_eq!(store.pending(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recorded_attempts_apply_to_the_stored_job() {
        let job = aged("a", 0);
        let store = InMemoryJobStore::with_jobs(vec![job.clone()]);

        let mut reviewed = job.clone();
        reviewed.is_applied = true;
        store.commit(&reviewed).await.unwrap();

        let status = store
            .record_attempt(
                job.id,
                ApplicationAttempt {
                    timestamp: Utc::now(),
                    status: AttemptStatus::Failure,
                    error_message: Some("boom".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(status, AttemptStatus::Failure);

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert!(stored.is_applied && !stored.should_apply);
        assert_eq!(stored.attempts.len(), 1);

        let missing = JobId::new();
        assert_eq!(
            store
                .record_attempt(
                    missing,
                    ApplicationAttempt {
                        timestamp: Utc::now(),
                        status: AttemptStatus::Success,
                        error_message: None,
                    },
                )
                .await,
            Err(StoreError::NotFound(missing))
        );
    }

    #[tokio::test]
    async fn commit_requires_an_existing_job() {
        let store = InMemoryJobStore::new();
        let mut job = aged("a", 0);
        assert_eq!(
            store.commit(&job).await,
            Err(StoreError::NotFound(job.id))
        );

        store.insert(job.clone()).await.unwrap();
        assert_eq!(
            store.insert(job.clone()).await,
            Err(StoreError::Duplicate(job.id))
        );

        job.should_apply = false;
        store.commit(&job).await.unwrap();
        assert!(!store.get(job.id).await.unwrap().unwrap().should_apply);
        assert_eq!(store.len(), 1);
    }
}
