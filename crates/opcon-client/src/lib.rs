//! Typed HTTP client for the supervisory backend.
//!
//! One async operation per backend capability: each takes scalar
//! parameters, issues exactly one request, and resolves to a typed payload
//! or a [`ClientError`]. No retries, no caching, no business logic.

use opcon_core::wire::{
    self, AgentsResponse, ConfigContentResponse, ConfigsResponse, ExperimentDataResponse,
    ExperimentReadiness, ExperimentSubmission, ExperimentsListResponse, InstallAgentRequest,
    LogResponse, MessageResponse, SaveConfigRequest, StatusesResponse, StoreConfigRequest,
    SubmitExperimentResponse, TopicsResponse,
};
use opcon_core::{Agent, AgentStatus};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod paths;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request completed and the backend reported a structured failure.
    #[error("backend error: {detail}")]
    Backend { detail: String },
    /// The request never completed (connect failure, timeout, bad payload).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// The one-line text surfaced to the operator: backend detail verbatim,
    /// or a generic fallback when the transport itself failed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Backend { detail } => detail.clone(),
            ClientError::Transport(_) => "backend unreachable (request did not complete)".into(),
        }
    }
}

pub struct ConsoleClient {
    base_url: String,
    http: reqwest::Client,
}

impl ConsoleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<Value>()
                .await
                .ok()
                .as_ref()
                .and_then(wire::error_detail)
                .unwrap_or_else(|| format!("backend returned {status}"));
            return Err(ClientError::Backend { detail });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::decode(resp).await
    }

    // ------------------- agents -------------------

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ClientError> {
        let resp: AgentsResponse = self.get_json(paths::AGENTS).await?;
        Ok(resp.agents)
    }

    pub async fn list_statuses(&self) -> Result<BTreeMap<String, AgentStatus>, ClientError> {
        let resp: StatusesResponse = self.get_json(paths::AGENT_STATUSES).await?;
        Ok(resp.statuses)
    }

    pub async fn start_agent(&self, identity: &str) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::start_agent(identity)))
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn stop_agent(&self, identity: &str) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::stop_agent(identity)))
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn remove_agent(&self, identity: &str) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .delete(self.url(&paths::remove_agent(identity)))
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn install_agent(
        &self,
        request: &InstallAgentRequest,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(paths::INSTALL_AGENT))
            .json(request)
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    // ------------------- configuration store -------------------

    pub async fn list_configs(&self, identity: &str) -> Result<Vec<String>, ClientError> {
        let resp: ConfigsResponse = self.get_json(&paths::configs(identity)).await?;
        Ok(resp.configs)
    }

    pub async fn config_content(
        &self,
        identity: &str,
        config: &str,
    ) -> Result<String, ClientError> {
        let resp: ConfigContentResponse = self.get_json(&paths::config(identity, config)).await?;
        Ok(resp.content)
    }

    pub async fn save_config(
        &self,
        identity: &str,
        config: &str,
        content: &str,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::config(identity, config)))
            .json(&SaveConfigRequest {
                content: content.to_string(),
            })
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn add_config(
        &self,
        identity: &str,
        request: &StoreConfigRequest,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::add_config(identity)))
            .json(request)
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn delete_config(
        &self,
        identity: &str,
        config: &str,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .delete(self.url(&paths::config(identity, config)))
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    // ------------------- experiments -------------------

    pub async fn submit_experiment(
        &self,
        submission: &ExperimentSubmission,
    ) -> Result<SubmitExperimentResponse, ClientError> {
        let resp = self
            .http
            .post(self.url(paths::SUBMIT_EXPERIMENT))
            .json(submission)
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn authorize_experiment(
        &self,
        experiment_id: &str,
        supervisor_name: &str,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::authorize_experiment(experiment_id)))
            .query(&[("supervisor_name", supervisor_name)])
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn finalize_experiment(
        &self,
        experiment_id: &str,
        readiness: &ExperimentReadiness,
    ) -> Result<Option<String>, ClientError> {
        let resp = self
            .http
            .post(self.url(&paths::finalize_experiment(experiment_id)))
            .json(readiness)
            .send()
            .await?;
        let body: MessageResponse = Self::decode(resp).await?;
        Ok(body.message)
    }

    pub async fn list_experiments(&self) -> Result<Vec<Value>, ClientError> {
        let resp: ExperimentsListResponse = self.get_json(paths::EXPERIMENTS_LIST).await?;
        Ok(resp.list)
    }

    pub async fn experiment_data(&self, experiment_id: &str) -> Result<Value, ClientError> {
        let resp: ExperimentDataResponse = self
            .get_json(&paths::experiment_data(experiment_id))
            .await?;
        Ok(resp.data)
    }

    pub async fn list_topics(&self) -> Result<Value, ClientError> {
        let resp: TopicsResponse = self.get_json(paths::TOPICS).await?;
        Ok(resp.data)
    }

    // ------------------- log -------------------

    pub async fn fetch_log(&self) -> Result<String, ClientError> {
        let resp: LogResponse = self.get_json(paths::LOG).await?;
        Ok(resp.log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ConsoleClient::new("http://127.0.0.1:8000/");
        assert_eq!(client.url(paths::AGENTS), "http://127.0.0.1:8000/agents");
    }

    #[test]
    fn backend_error_message_is_verbatim_detail() {
        let err = ClientError::Backend {
            detail: "no such agent: listener1".into(),
        };
        assert_eq!(err.user_message(), "no such agent: listener1");
    }
}
