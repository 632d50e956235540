//! Inference Service Client
//!
//! A narrow contract to the external asynchronous inference API: submit a
//! transformation job, then query its status by id. The production client
//! lives in [`client`]; runs are driven through the trait so tests can
//! substitute a scripted fake.

mod client;
pub mod error;

pub use client::{Deployment, InferenceClient};
pub use error::InferenceError;

use crate::job::{Job, JobParameters};

#[async_trait::async_trait]
pub trait InferenceService: Send + Sync {
    /// Submit a transformation job for a publicly fetchable image URL.
    ///
    /// An empty URL is rejected before anything is sent upstream.
    async fn submit(&self, image_url: &str, params: &JobParameters)
        -> Result<Job, InferenceError>;

    /// Fetch the current snapshot of a previously submitted job.
    async fn get(&self, job_id: &str) -> Result<Job, InferenceError>;
}
