//! Job Lifecycle Controller
//!
//! Drives one transformation job from submission to a terminal status:
//! submit, then poll at a fixed cadence until the service reports succeeded,
//! failed, or canceled. One runner drives one run; concurrent runs share
//! nothing beyond the HTTP connection pool inside the service client.

use crate::consts::run::{
    MAX_TRANSIENT_POLLS, POLL_INTERVAL_MS, RETRY_BACKOFF_CAP_SECS, RUN_DEADLINE_SECS,
};
use crate::inference::InferenceService;
use crate::job::{ExtractError, ExtractPolicy, Job, JobParameters, JobStatus};
use log::{debug, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum JobError {
    /// The service refused the job outright.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// A status query failed and retries, if any, were exhausted.
    #[error("status poll failed: {0}")]
    PollFailed(String),

    /// The service accepted the job and later reported it failed or canceled.
    #[error("image processing failed, please try again")]
    JobFailed,

    /// The run deadline elapsed before the job reached a terminal status.
    #[error("job {id} still {status} after {elapsed:?}")]
    TimedOut {
        id: String,
        status: JobStatus,
        elapsed: Duration,
    },

    /// The job succeeded but its output could not be reduced to one result.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Observable phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

/// Tunables for a run. `Default` matches the production cadence.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Mandatory wait before every status query, including the first.
    pub poll_interval: Duration,
    /// Wall-clock bound on the polling phase.
    pub deadline: Duration,
    /// Transient poll failures tolerated before giving up.
    pub max_transient_polls: u32,
    pub extract: ExtractPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            deadline: Duration::from_secs(RUN_DEADLINE_SECS),
            max_transient_polls: MAX_TRANSIENT_POLLS,
            extract: ExtractPolicy::default(),
        }
    }
}

pub struct JobRunner<S> {
    service: S,
    config: RunnerConfig,
    progress: Option<mpsc::Sender<Job>>,
    state: RunState,
}

impl<S: InferenceService> JobRunner<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, RunnerConfig::default())
    }

    pub fn with_config(service: S, config: RunnerConfig) -> Self {
        Self {
            service,
            config,
            progress: None,
            state: RunState::Idle,
        }
    }

    /// Attach a channel that receives every job snapshot the runner observes,
    /// in fetch order and without loss.
    pub fn with_progress(mut self, sender: mpsc::Sender<Job>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    async fn publish(&self, job: &Job) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(job.clone()).await;
        }
    }

    /// Drive one job from submission to a terminal status and extract the
    /// result reference.
    ///
    /// Dropping the returned future abandons the run; the only suspension
    /// point is the pre-poll wait, so the pending timer is torn down with the
    /// future and no further status query is issued.
    pub async fn run(
        &mut self,
        image_url: &str,
        params: &JobParameters,
    ) -> Result<String, JobError> {
        self.state = RunState::Submitting;
        let mut job = match self.service.submit(image_url, params).await {
            Ok(job) => job,
            Err(e) => {
                self.state = RunState::Failed;
                return Err(JobError::SubmissionFailed(e.detail()));
            }
        };
        self.publish(&job).await;

        self.state = RunState::Polling;
        let started = Instant::now();
        let mut transient_failures: u32 = 0;

        while !job.status.is_terminal() {
            if started.elapsed() >= self.config.deadline {
                self.state = RunState::Failed;
                return Err(JobError::TimedOut {
                    id: job.id,
                    status: job.status,
                    elapsed: started.elapsed(),
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;

            match self.service.get(&job.id).await {
                Ok(snapshot) => {
                    transient_failures = 0;
                    job = snapshot;
                    debug!(
                        "job {} is {} after {:?}",
                        job.id,
                        job.status,
                        started.elapsed()
                    );
                    self.publish(&job).await;
                }
                Err(e) if e.is_transient()
                    && transient_failures < self.config.max_transient_polls =>
                {
                    transient_failures += 1;
                    let backoff = backoff_for(transient_failures);
                    warn!(
                        "status query for job {} failed ({}), retry {}/{} in {:?}",
                        job.id, e, transient_failures, self.config.max_transient_polls, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    self.state = RunState::Failed;
                    return Err(JobError::PollFailed(e.detail()));
                }
            }
        }

        match job.status {
            JobStatus::Succeeded => match self.config.extract.select(job.output.as_ref()) {
                Ok(result) => {
                    self.state = RunState::Succeeded;
                    Ok(result)
                }
                Err(e) => {
                    self.state = RunState::Failed;
                    Err(JobError::Extract(e))
                }
            },
            _ => {
                self.state = RunState::Failed;
                Err(JobError::JobFailed)
            }
        }
    }
}

/// Exponential backoff for transient poll failures, capped.
fn backoff_for(attempt: u32) -> Duration {
    let secs = std::cmp::min(2u64.pow(attempt - 1), RETRY_BACKOFF_CAP_SECS);
    Duration::from_secs(secs)
}
