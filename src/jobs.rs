use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{JobStatus, JobUpdate, NewJobRequest};
use crate::organization;

/// Upload/processing jobs the UI is following, keyed by job id. Insertion
/// order is kept so the list reads oldest first.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<Mutex<HashMap<String, JobStatus>>>,
    order: Arc<Mutex<Vec<String>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a job. Progress starts at zero; filenames are stored
    /// under the organization namespace they were uploaded to.
    pub fn add(&self, request: NewJobRequest) -> JobStatus {
        let job_id = request
            .job_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let status = JobStatus {
            job_id: job_id.clone(),
            status: request.status,
            file_type: request.file_type,
            filenames: request
                .filenames
                .iter()
                .map(|name| organization::namespaced_path(request.organization.as_deref(), name))
                .collect(),
            progress: 0,
            total: 0,
            updated_at: Utc::now(),
        };

        let mut jobs = lock(&self.jobs);
        if jobs.insert(job_id.clone(), status.clone()).is_none() {
            lock(&self.order).push(job_id);
        }
        tracing::debug!(job_id = %status.job_id, "tracking background job");
        status
    }

    pub fn update(&self, job_id: &str, update: JobUpdate) -> Option<JobStatus> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.get_mut(job_id)?;

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(filenames) = update.filenames {
            job.filenames = filenames;
        }
        if let Some(progress) = update.progress {
            job.progress = progress;
        }
        if let Some(total) = update.total {
            job.total = total;
        }
        job.updated_at = Utc::now();
        Some(job.clone())
    }

    pub fn remove(&self, job_id: &str) -> Option<JobStatus> {
        let removed = lock(&self.jobs).remove(job_id);
        if removed.is_some() {
            lock(&self.order).retain(|id| id != job_id);
        }
        removed
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        lock(&self.jobs).get(job_id).cloned()
    }

    pub fn list(&self) -> Vec<JobStatus> {
        let jobs = lock(&self.jobs);
        lock(&self.order)
            .iter()
            .filter_map(|id| jobs.get(id).cloned())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
