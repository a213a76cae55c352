//! Execution of a single configured job.
//!
//! A job repeats one pipeline pass per interval until its generation is
//! cancelled. A failing step aborts only the current pass.

use crate::config::JobConfig;
use crate::task::context::TransformationContext;
use crate::task::transformer::{Error, Transformers};
use crate::value::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Executing a pipeline pass.
    Running,
    /// Sleeping until the next interval or cancellation.
    Waiting,
    /// Terminal: cancelled, or the single pass of a run-once job finished.
    Stopped,
}

/// A job bound to the transformer table of its generation.
pub struct Job {
    config: JobConfig,
    transformers: Arc<Transformers>,
}

impl Job {
    pub fn new(config: JobConfig, transformers: Arc<Transformers>) -> Self {
        Self {
            config,
            transformers,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.job_name
    }

    /// Runs every step once and returns the final context.
    ///
    /// The pass starts from empty mappings. Each step that does not keep the
    /// context first moves the previous result into `object`.
    pub async fn run_pass(&self) -> Result<TransformationContext, Error> {
        let mut ctx = TransformationContext::new(
            Value::empty_map(),
            Value::empty_map(),
            Arc::clone(&self.transformers),
        );
        for (index, step) in self.config.steps.iter().enumerate() {
            if !step.keep_context {
                ctx = ctx.next();
            }
            step.transformer
                .transform(&mut ctx)
                .await
                .map_err(|source| Error::Step {
                    index,
                    source: Box::new(source),
                })?;
            debug!(index, kind = %step.kind, "step finished");
        }
        Ok(ctx)
    }

    /// Repeats passes until `cancel` flips to `true` or its sender is dropped.
    ///
    /// Cancellation is observed between passes; a started pass runs to completion.
    #[tracing::instrument(skip_all, name = "job", fields(job = %self.config.job_name))]
    pub async fn run(self, mut cancel: watch::Receiver<bool>, state: watch::Sender<JobState>) {
        loop {
            if *cancel.borrow_and_update() {
                break;
            }

            state.send_replace(JobState::Running);
            info!("Starting job");
            match self.run_pass().await {
                Ok(_) => info!("Finished job"),
                Err(e) => error!("{}", e),
            }

            if self.config.interval.is_zero() {
                break;
            }

            state.send_replace(JobState::Waiting);
            tokio::select! {
                biased;
                _ = cancel.changed() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
        state.send_replace(JobState::Stopped);
        debug!("Job stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::Registry;
    use crate::task::register_builtins;
    use serde_json::json;
    use std::time::Duration;

    fn parse(document: &str) -> Config {
        let registry = Registry::new();
        register_builtins(&registry).unwrap();
        Config::from_slice(document.as_bytes(), &registry).unwrap()
    }

    fn first_job(config: Config) -> Job {
        let transformers = Arc::clone(&config.transformers);
        let job = config.jobs.into_iter().next().unwrap();
        Job::new(job, transformers)
    }

    #[tokio::test]
    async fn test_alias_job_produces_value() {
        let config = parse(
            r#"
transformers:
  greet:
    type: value
    value: hi
jobs:
  - job_name: j
    interval: 0
    steps:
      - type: greet
"#,
        );
        let ctx = first_job(config).run_pass().await.unwrap();
        assert_eq!(ctx.result, Value::from("hi"));
    }

    #[tokio::test]
    async fn test_keep_context_step_sees_previous_pair() {
        let config = parse(
            r#"
jobs:
  - job_name: j
    steps:
      - type: value
        value: {a: 1}
      - type: field
        source: a
        target: copy
      - type: field
        keep_ctx: true
        source: a
        target: again
"#,
        );
        let ctx = first_job(config).run_pass().await.unwrap();
        assert_eq!(ctx.object, Value::from(json!({"a": 1})));
        assert_eq!(ctx.result, Value::from(json!({"copy": 1, "again": 1})));
    }

    #[tokio::test]
    async fn test_failure_reports_step_index() {
        let config = parse(
            r#"
jobs:
  - job_name: j
    steps:
      - type: value
        value: 1
      - type: array
        map: {type: field}
"#,
        );
        let err = first_job(config).run_pass().await.unwrap_err();
        assert!(matches!(err, Error::Step { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_run_once_stops_after_single_pass() {
        let config = parse(
            r#"
jobs:
  - job_name: once
    steps:
      - type: value
        value: 1
"#,
        );
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(JobState::Running);
        first_job(config).run(cancel_rx, state_tx).await;
        assert_eq!(*state_rx.borrow(), JobState::Stopped);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let config = parse(
            r#"
jobs:
  - job_name: repeat
    interval: 1h
    steps:
      - type: value
        value: 1
"#,
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, mut state_rx) = watch::channel(JobState::Running);
        let handle = tokio::spawn(first_job(config).run(cancel_rx, state_tx));

        state_rx
            .wait_for(|state| *state == JobState::Waiting)
            .await
            .unwrap();
        cancel_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*state_rx.borrow(), JobState::Stopped);
    }

    #[tokio::test]
    async fn test_already_cancelled_job_never_runs() {
        let config = parse(
            r#"
jobs:
  - job_name: late
    interval: 10s
"#,
        );
        let (cancel_tx, cancel_rx) = watch::channel(false);
        cancel_tx.send(true).unwrap();
        let (state_tx, state_rx) = watch::channel(JobState::Waiting);
        first_job(config).run(cancel_rx, state_tx).await;
        assert_eq!(*state_rx.borrow(), JobState::Stopped);
    }
}
