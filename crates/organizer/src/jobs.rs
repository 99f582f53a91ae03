use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::pipeline::OrganizeResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Informational progress marker. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    Initializing,
    Fetching,
    Analyzing,
    Creating,
    Done,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: String,
    pub status: JobStatus,
    pub stage: JobStage,
    pub tracks_processed: usize,
    pub total_tracks: usize,
    pub genres_discovered: Vec<String>,
    pub result: Option<OrganizeResult>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Job {
    fn new(id: Uuid, user_id: &str) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            status: JobStatus::Pending,
            stage: JobStage::Initializing,
            tracks_processed: 0,
            total_tracks: 0,
            genres_discovered: Vec::new(),
            result: None,
            error: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn transition(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!(
                job_id = %self.id,
                from = ?self.status,
                to = ?next,
                "ignoring invalid job transition"
            );
            return false;
        }
        self.status = next;
        true
    }

    fn advance(&mut self, stage: JobStage, processed: usize, total: usize) {
        if stage < self.stage {
            debug!(job_id = %self.id, stage = ?stage, current = ?self.stage, "stale progress report");
            return;
        }
        if stage > self.stage {
            self.stage = stage;
            self.tracks_processed = processed;
            self.total_tracks = total;
            return;
        }
        self.tracks_processed = self.tracks_processed.max(processed);
        self.total_tracks = self.total_tracks.max(total);
    }
}

/// In-memory job table shared by the request layer and every pipeline task.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().insert(id, Job::new(id, user_id));
        id
    }

    /// Snapshot of the job, or `None` when the id is unknown.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    pub fn reporter(&self, id: Uuid) -> JobReporter {
        JobReporter {
            registry: self.clone(),
            id,
        }
    }

    fn update<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut Job),
    {
        let mut guard = self.jobs.write();
        match guard.get_mut(&id) {
            Some(job) => {
                apply(job);
                true
            }
            None => false,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: JobStage, processed: usize, total: usize);
}

/// Sink for callers that have nobody polling.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: JobStage, _processed: usize, _total: usize) {}
}

/// Write side of one job entry. Owned by the job's pipeline task.
#[derive(Clone)]
pub struct JobReporter {
    registry: JobRegistry,
    id: Uuid,
}

impl JobReporter {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mark_processing(&self) {
        self.registry.update(self.id, |job| {
            if job.transition(JobStatus::Processing) {
                job.advance(JobStage::Fetching, 0, 0);
            }
        });
    }

    pub fn set_discovered(&self, genres: Vec<String>) {
        self.registry.update(self.id, |job| job.genres_discovered = genres);
    }

    pub fn complete(&self, result: OrganizeResult) {
        self.registry.update(self.id, |job| {
            if job.transition(JobStatus::Completed) {
                let created = result.playlists.len();
                job.advance(JobStage::Done, created, created);
                job.result = Some(result);
            }
        });
    }

    pub fn fail(&self, message: &str) {
        self.registry.update(self.id, |job| {
            if job.transition(JobStatus::Failed) {
                job.error = Some(message.to_string());
            }
        });
    }
}

impl ProgressSink for JobReporter {
    fn report(&self, stage: JobStage, processed: usize, total: usize) {
        self.registry
            .update(self.id, |job| job.advance(stage, processed, total));
    }
}

/// A spawned pipeline run. Dropping the handle detaches the task.
pub struct JobHandle {
    id: Uuid,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub(crate) fn new(id: Uuid, task: JoinHandle<()>) -> Self {
        Self { id, task }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PlaylistResult;
    use common::ParentGenre;

    #[test]
    fn status_edges() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn unknown_job_is_not_found() {
        let registry = JobRegistry::new();
        registry.create("user");
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn new_jobs_start_pending() {
        let registry = JobRegistry::new();
        let id = registry.create("user");
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.stage, JobStage::Initializing);
        assert_eq!(job.user_id, "user");
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let registry = JobRegistry::new();
        let id = registry.create("user");
        let reporter = registry.reporter(id);

        reporter.fail("too early");
        assert_eq!(registry.get(id).unwrap().status, JobStatus::Pending);

        reporter.mark_processing();
        reporter.fail("boom");
        reporter.complete(OrganizeResult::default());
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
    }

    #[test]
    fn progress_is_monotonic_and_rebased_per_stage() {
        let registry = JobRegistry::new();
        let id = registry.create("user");
        let reporter = registry.reporter(id);
        reporter.mark_processing();

        reporter.report(JobStage::Fetching, 50, 120);
        reporter.report(JobStage::Fetching, 40, 120);
        let job = registry.get(id).unwrap();
        assert_eq!((job.tracks_processed, job.total_tracks), (50, 120));

        reporter.report(JobStage::Creating, 0, 3);
        reporter.report(JobStage::Analyzing, 120, 120);
        let job = registry.get(id).unwrap();
        assert_eq!(job.stage, JobStage::Creating);
        assert_eq!((job.tracks_processed, job.total_tracks), (0, 3));
    }

    #[test]
    fn completion_records_result_and_done_stage() {
        let registry = JobRegistry::new();
        let id = registry.create("user");
        let reporter = registry.reporter(id);
        reporter.mark_processing();
        reporter.complete(OrganizeResult {
            playlists: vec![PlaylistResult {
                name: "Rock by Organizer".to_string(),
                genre: ParentGenre::Rock,
                playlist_id: "pl-1".to_string(),
                url: String::new(),
                track_count: 2,
            }],
        });
        let job = registry.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.stage, JobStage::Done);
        assert_eq!(job.result.unwrap().playlists.len(), 1);
    }

    #[test]
    fn job_serializes_lowercase_states() {
        let registry = JobRegistry::new();
        let id = registry.create("user");
        let value = serde_json::to_value(registry.get(id).unwrap()).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["stage"], "initializing");
        assert_eq!(value["id"], id.to_string());
    }
}
