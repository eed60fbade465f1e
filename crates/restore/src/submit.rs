use async_trait::async_trait;
use dcos_backup_domain::model::ConfigItem;
use reqwest::Client;
use thiserror::Error;

/// Status and body returned by the target service for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: String,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

/// Creates one item on the target service.
#[async_trait]
pub trait ItemSubmitter: Send + Sync {
    async fn submit(&self, item: &ConfigItem) -> Result<SubmitResponse, SubmitError>;
}

/// POSTs each item as a JSON body to a fixed URL.
pub struct HttpItemSubmitter {
    client: Client,
    url: String,
}

impl HttpItemSubmitter {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ItemSubmitter for HttpItemSubmitter {
    async fn submit(&self, item: &ConfigItem) -> Result<SubmitResponse, SubmitError> {
        let transport = |err: reqwest::Error| SubmitError::Transport {
            url: self.url.clone(),
            reason: err.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(item)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport)?;
        Ok(SubmitResponse { status, body })
    }
}
