use std::collections::HashMap;

use async_trait::async_trait;
use dcos_backup_domain::{config::BackupConfig, model::TrackedService};
use metrics::counter;
use reqwest::{Client, StatusCode};
use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request {endpoint} failed with status {status}")]
    UpstreamUnavailable { endpoint: String, status: u16 },
    #[error("request {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("response from {endpoint} is not valid JSON: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Reads the declared state of a tracked service.
///
/// Returns the response body as sent by the service. Implementations check
/// that it is JSON but never rebuild it.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch(&self, service: TrackedService) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `GET {base}{listing path}` over HTTP.
pub struct HttpConfigFetcher {
    client: Client,
    base_urls: HashMap<TrackedService, String>,
}

impl HttpConfigFetcher {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_urls: HashMap::new(),
        }
    }

    pub fn from_config(client: Client, config: &BackupConfig) -> Self {
        TrackedService::BACKUP_ORDER
            .into_iter()
            .fold(Self::new(client), |fetcher, service| {
                fetcher.with_base_url(service, config.service_url(service))
            })
    }

    pub fn with_base_url(mut self, service: TrackedService, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.base_urls
            .insert(service, url.trim_end_matches('/').to_string());
        self
    }

    pub fn endpoint(&self, service: TrackedService) -> Option<String> {
        self.base_urls
            .get(&service)
            .map(|base| format!("{base}{}", service.listing_path()))
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch(&self, service: TrackedService) -> Result<Vec<u8>, FetchError> {
        let Some(endpoint) = self.endpoint(service) else {
            return Err(FetchError::Transport {
                endpoint: service.listing_path().to_string(),
                reason: format!("no base url configured for {service}"),
            });
        };

        debug!(%service, endpoint, "fetching declared state");
        let response = match self.client.get(&endpoint).send().await {
            Ok(response) => response,
            Err(err) => {
                counter!("backup_fetches_total", "service" => service.name(), "result" => "transport").increment(1);
                error!(endpoint, error = %err, "request failed");
                return Err(FetchError::Transport {
                    endpoint,
                    reason: err.to_string(),
                });
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            counter!("backup_fetches_total", "service" => service.name(), "result" => "status").increment(1);
            error!(endpoint, status = status.as_u16(), "request failed with non-200 status");
            return Err(FetchError::UpstreamUnavailable {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                counter!("backup_fetches_total", "service" => service.name(), "result" => "transport").increment(1);
                error!(endpoint, error = %err, "failed to read response body");
                return Err(FetchError::Transport {
                    endpoint,
                    reason: err.to_string(),
                });
            }
        };

        if let Err(err) = serde_json::from_slice::<IgnoredAny>(&body) {
            counter!("backup_fetches_total", "service" => service.name(), "result" => "decode").increment(1);
            error!(endpoint, error = %err, "response body is not JSON");
            return Err(FetchError::Decode {
                endpoint,
                reason: err.to_string(),
            });
        }

        counter!("backup_fetches_total", "service" => service.name(), "result" => "ok").increment(1);
        Ok(body.to_vec())
    }
}
