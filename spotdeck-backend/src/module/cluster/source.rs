//! Where cluster snapshots come from

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::parser::{ClusterSpot, parse_cluster_json};
use crate::config::ClusterConfig;
use crate::error::{PipelineError, PipelineResult};

/// A feed that returns the currently active cluster spots
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Label shown as the view's active source
    fn name(&self) -> &str;

    async fn fetch(&self) -> PipelineResult<Vec<ClusterSpot>>;
}

/// HTTP JSON cluster endpoint, queried with `?source=<selector>`
pub struct HttpClusterSource {
    client: Client,
    url: String,
    source: String,
}

impl HttpClusterSource {
    pub fn new(config: &ClusterConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .user_agent(concat!("spotdeck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            source: config.source.clone(),
        })
    }

    pub fn request_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}source={}", self.url, separator, urlencoding::encode(&self.source))
    }
}

#[async_trait]
impl ClusterSource for HttpClusterSource {
    fn name(&self) -> &str {
        &self.source
    }

    async fn fetch(&self) -> PipelineResult<Vec<ClusterSpot>> {
        let url = self.request_url();
        tracing::debug!("Fetching DX cluster spots from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Transport(format!("cluster endpoint returned HTTP {}", status)));
        }

        let body = response.text().await?;
        parse_cluster_json(&body)
    }
}
