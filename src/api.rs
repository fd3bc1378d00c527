use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use crate::envelope::{ExternalStatus, MemoryStats, ResponseEnvelope};

#[derive(Serialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct AgentActionRequest {
    action_id: String,
}

#[derive(Serialize)]
struct ApiKeyRequest {
    service: String,
    api_key: String,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the Nova backend.
#[derive(Clone)]
pub struct NovaClient {
    client: Client,
    base_url: String,
}

impl NovaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the backend's error field out of a non-OK reply, falling back to
    /// a generic message.
    async fn backend_error(response: reqwest::Response) -> anyhow::Error {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        anyhow!(body.error.unwrap_or_else(|| "Something went wrong".to_string()))
    }

    pub async fn chat(&self, message: &str) -> Result<ResponseEnvelope> {
        let request = ChatRequest {
            message: message.to_string(),
        };

        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        let response = self.client.get(self.url("/api/stats")).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to load stats: {}", response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn external_status(&self) -> Result<ExternalStatus> {
        let response = self
            .client
            .get(self.url("/api/external/status"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Status fetch failed: {}", response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn daily_plan(&self) -> Result<ResponseEnvelope> {
        self.get_envelope("/api/agent/daily-plan").await
    }

    pub async fn insights(&self) -> Result<ResponseEnvelope> {
        self.get_envelope("/api/agent/insights").await
    }

    pub async fn agent_status(&self) -> Result<ResponseEnvelope> {
        self.get_envelope("/api/agent/status").await
    }

    async fn get_envelope(&self, path: &str) -> Result<ResponseEnvelope> {
        let response = self.client.get(self.url(path)).send().await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn agent_action(&self, action_id: &str) -> Result<ResponseEnvelope> {
        let request = AgentActionRequest {
            action_id: action_id.to_string(),
        };

        let response = self
            .client
            .post(self.url("/api/agent/action"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn save_api_key(&self, service: &str, api_key: &str) -> Result<()> {
        let request = ApiKeyRequest {
            service: service.to_string(),
            api_key: api_key.to_string(),
        };

        let response = self
            .client
            .post(self.url("/api/config/api-key"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = NovaClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/chat"), "http://localhost:5000/api/chat");
    }
}
