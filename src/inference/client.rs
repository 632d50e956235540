//! HTTP client for the external inference service.

use crate::environment::Environment;
use crate::inference::InferenceService;
use crate::inference::error::InferenceError;
use crate::job::{Job, JobParameters};
use log::debug;
use rand::Rng;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde_json::json;
use std::time::Duration;

/// Identifies the model deployment jobs are submitted to.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    environment: Environment,
    deployment: Deployment,
    token: String,
}

impl InferenceClient {
    /// Create a new client for the given environment and deployment. The
    /// token is the API credential supplied through the process environment.
    pub fn new(environment: Environment, deployment: Deployment, token: String) -> Self {
        Self {
            client: ClientBuilder::new()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            environment,
            deployment,
            token,
        }
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.environment.inference_url().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn handle_response_status(
        response: Response,
        expected: StatusCode,
    ) -> Result<Response, InferenceError> {
        if response.status() != expected {
            return Err(InferenceError::from_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl InferenceService for InferenceClient {
    async fn submit(
        &self,
        image_url: &str,
        params: &JobParameters,
    ) -> Result<Job, InferenceError> {
        if image_url.is_empty() {
            return Err(InferenceError::MissingInput);
        }

        // Pin the seed before the request leaves so the submitted input is
        // fully reproducible from the logs.
        let seed = params
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..1_000_000));
        let body = json!({
            "input": {
                "prompt": params.prompt,
                "image": image_url,
                "negative_prompt": params.negative_prompt,
                "num_inference_steps": params.num_inference_steps,
                "guidance_scale": params.guidance_scale,
                "strength": params.strength,
                "seed": seed,
            }
        });

        let endpoint = format!(
            "v1/deployments/{}/{}/predictions",
            self.deployment.owner, self.deployment.name
        );
        let response = self
            .client
            .post(self.build_url(&endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let response = Self::handle_response_status(response, StatusCode::CREATED).await?;
        let job = response.json::<Job>().await?;
        debug!("job {} accepted with status {} (seed {})", job.id, job.status, seed);
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Job, InferenceError> {
        let id_path = urlencoding::encode(job_id).into_owned();
        let endpoint = format!("v1/predictions/{}", id_path);

        let response = self
            .client
            .get(self.build_url(&endpoint))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::handle_response_status(response, StatusCode::OK).await?;
        Ok(response.json::<Job>().await?)
    }
}


#[cfg(test)]
/// These are ignored by default since they require live service endpoints.
mod live_inference_tests {
    use super::*;
    use crate::inference::InferenceService;

    fn live_client() -> InferenceClient {
        let token = std::env::var("REPLICATE_API_TOKEN").unwrap_or_default();
        InferenceClient::new(
            Environment::Production,
            Deployment {
                owner: "muva".to_string(),
                name: "booth-img2img".to_string(),
            },
            token,
        )
    }

    #[tokio::test]
    #[ignore] // This test requires a live inference deployment.
    /// Should accept a job for a fetchable image and hand back a handle.
    async fn test_submit_live() {
        let client = live_client();
        match client
            .submit("https://example.com/photo.jpg", &JobParameters::default())
            .await
        {
            Ok(job) => {
                println!("Submitted job: {} ({})", job.id, job.status);
                assert!(!job.id.is_empty());
            }
            Err(e) => panic!("Failed to submit job: {}", e),
        }
    }

    #[tokio::test]
    #[ignore] // This test requires a live inference deployment.
    /// Should return the current snapshot for a previously submitted job.
    async fn test_get_live() {
        let client = live_client();
        let job_id = "replace-with-a-real-job-id";
        match client.get(job_id).await {
            Ok(job) => println!("Job {} is {}", job.id, job.status),
            Err(e) => panic!("Failed to query job status: {}", e),
        }
    }
}
