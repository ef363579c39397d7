//! Task endpoints

use async_trait::async_trait;
use decrypter_core::domain::task::Job;
use decrypter_core::dto::task::{SolveRequest, TaskCreated, TaskLookup, TaskSnapshot};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::{SolverApi, SolverClient, validate_cipher_text};

#[async_trait]
impl SolverApi for SolverClient {
    /// POST /solve
    async fn submit(&self, cipher_text: &str, seed: Option<i64>) -> Result<Job> {
        validate_cipher_text(cipher_text)?;

        let url = format!("{}/solve", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SolveRequest {
                cipher: cipher_text.to_string(),
                seed,
            })
            .send()
            .await?;

        let created: TaskCreated = self.handle_response(response).await?;
        info!("Submitted cipher ({} chars) as task {}", cipher_text.len(), created.task_id);

        Ok(created.task_id)
    }

    /// GET /tasks/{task_id}
    async fn fetch_status(&self, job: &Job) -> Result<TaskSnapshot> {
        let url = format!("{}/tasks/{}", self.base_url, job);
        let response = self.client.get(&url).send().await?;

        match self.handle_response(response).await? {
            TaskLookup::Found(snapshot) => Ok(snapshot),
            TaskLookup::Missing { error } => {
                debug!("Service has no task {}: {}", job, error);
                Err(ClientError::NotFound(job.to_string()))
            }
        }
    }
}
