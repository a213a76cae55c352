//! Generation based job scheduling.
//!
//! Every adopted configuration becomes a generation: one task per job plus a
//! shared cancellation signal. Launching a new generation cancels the previous
//! one first; its jobs wind down at their next cancellation check while the
//! new jobs start.

use crate::config::Config;
use crate::job::{Job, JobState};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Handle to one spawned job.
#[derive(Debug)]
pub struct JobHandle {
    name: String,
    state: watch::Receiver<JobState>,
    handle: JoinHandle<()>,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// Receiver following the job's state transitions.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }
}

#[derive(Debug)]
struct Generation {
    id: u64,
    cancel: watch::Sender<bool>,
    jobs: Vec<JobHandle>,
}

/// Runs the jobs of the current configuration generation.
#[derive(Debug, Default)]
pub struct Scheduler {
    current: Option<Generation>,
    launched: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the running generation and spawns the jobs of `config`.
    ///
    /// Returns the identifier of the new generation.
    pub fn launch(&mut self, config: Config) -> u64 {
        self.cancel();

        self.launched += 1;
        let id = self.launched;
        let (cancel, _) = watch::channel(false);
        let transformers = config.transformers;

        let jobs: Vec<JobHandle> = config
            .jobs
            .into_iter()
            .map(|job_config| {
                let name = job_config.job_name.clone();
                let (state_tx, state_rx) = watch::channel(JobState::Running);
                let job = Job::new(job_config, Arc::clone(&transformers));
                let handle = tokio::spawn(job.run(cancel.subscribe(), state_tx));
                JobHandle {
                    name,
                    state: state_rx,
                    handle,
                }
            })
            .collect();

        info!(generation = id, jobs = jobs.len(), "Launched generation");
        self.current = Some(Generation { id, cancel, jobs });
        id
    }

    /// Signals every job of the running generation to stop.
    pub fn cancel(&mut self) {
        if let Some(generation) = self.current.take() {
            generation.cancel.send_replace(true);
            info!(generation = generation.id, "Cancelled generation");
        }
    }

    /// Identifier of the running generation.
    pub fn generation(&self) -> Option<u64> {
        self.current.as_ref().map(|generation| generation.id)
    }

    pub fn jobs(&self) -> &[JobHandle] {
        self.current
            .as_ref()
            .map(|generation| generation.jobs.as_slice())
            .unwrap_or_default()
    }

    /// Waits until every job of the running generation has stopped.
    pub async fn wait(&mut self) {
        let Some(generation) = self.current.as_mut() else {
            return;
        };
        let jobs = std::mem::take(&mut generation.jobs);
        let results =
            futures_util::future::join_all(jobs.into_iter().map(|job| job.handle)).await;
        for result in results {
            if let Err(e) = result {
                error!("Job task failed: {}", e);
            }
        }
    }
}
