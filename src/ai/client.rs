use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::dto::WorkflowRequest;
use crate::config::AiConfig;

/// Runs a blocking AI workflow and returns the upstream JSON untouched.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    async fn run(&self, input: &str) -> anyhow::Result<Value>;
}

pub struct HttpWorkflowClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    user: String,
}

impl HttpWorkflowClient {
    pub fn new(cfg: &AiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
            user: cfg.user.clone(),
        })
    }

    fn run_url(&self) -> String {
        format!("{}/v1/workflows/run", self.base_url)
    }
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn run(&self, input: &str) -> anyhow::Result<Value> {
        let resp = self
            .http
            .post(self.run_url())
            .bearer_auth(&self.api_key)
            .json(&WorkflowRequest::blocking(input, &self.user))
            .send()
            .await
            .context("send workflow request")?
            .error_for_status()
            .context("workflow returned an error status")?;

        resp.json::<Value>().await.context("decode workflow response")
    }
}
