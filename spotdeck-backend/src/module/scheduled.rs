//! Scheduled task manager - owns the background pipelines
//!
//! - DX cluster polling (every `poll_interval_secs`)
//! - PSKReporter ingestor (its own actor, sweeps every `sweep_interval_secs`)

use std::sync::Arc;
use std::time::Duration;

use spotdeck_common::CallsignGeography;
use tokio::task::JoinHandle;

use super::cluster::{ClusterAggregator, HttpClusterSource};
use super::pskreporter::{IngestorSettings, MqttTransport, PskReporterIngestor};
use crate::config::BackendConfig;

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Interval between cluster polls
    pub cluster_poll_interval: Duration,

    /// Poll immediately on start instead of waiting one interval
    pub perform_initial_poll: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            cluster_poll_interval: Duration::from_secs(30),
            perform_initial_poll: true,
        }
    }
}

impl ScheduledTaskConfig {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            cluster_poll_interval: Duration::from_secs(config.cluster.poll_interval_secs.max(1)),
            perform_initial_poll: true,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    cluster: Option<Arc<ClusterAggregator>>,
    pskreporter: Arc<PskReporterIngestor>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(
        config: ScheduledTaskConfig,
        cluster: Option<Arc<ClusterAggregator>>,
        pskreporter: Arc<PskReporterIngestor>,
    ) -> Self {
        Self {
            config,
            cluster,
            pskreporter,
            task_handles: Vec::new(),
        }
    }

    /// Build both pipelines from the backend config. The ingestor starts
    /// connecting straight away; cluster polling waits for [`start_all`].
    ///
    /// [`start_all`]: ScheduledTaskManager::start_all
    pub fn from_config(config: &BackendConfig, geography: Arc<dyn CallsignGeography>) -> anyhow::Result<Self> {
        let cluster = if config.cluster.enable {
            let source = HttpClusterSource::new(&config.cluster)?;
            let aggregator = ClusterAggregator::new(
                Arc::new(source),
                geography.clone(),
                config.cluster.retention_minutes,
                config.cluster.max_spots,
                config.filter.clone(),
            )
            .with_fetch_timeout(Duration::from_secs(config.cluster.request_timeout_secs.max(1) + 5));
            Some(Arc::new(aggregator))
        } else {
            tracing::info!("DX cluster polling disabled");
            None
        };

        let pskreporter = PskReporterIngestor::spawn(
            IngestorSettings::from_config(&config.pskreporter),
            Arc::new(MqttTransport::new(&config.pskreporter)),
            geography,
            config.filter.clone(),
        );

        Ok(Self::new(
            ScheduledTaskConfig::from_config(config),
            cluster,
            Arc::new(pskreporter),
        ))
    }

    pub fn cluster(&self) -> Option<Arc<ClusterAggregator>> {
        self.cluster.clone()
    }

    pub fn pskreporter(&self) -> Arc<PskReporterIngestor> {
        self.pskreporter.clone()
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        if let Some(cluster) = &self.cluster {
            let handle = Self::start_cluster_polling(cluster.clone(), &self.config);
            self.task_handles.push(handle);
        }

        tracing::info!(
            "Started {} scheduled tasks (cluster poll every {}s)",
            self.task_handles.len(),
            self.config.cluster_poll_interval.as_secs()
        );
    }

    fn start_cluster_polling(cluster: Arc<ClusterAggregator>, config: &ScheduledTaskConfig) -> JoinHandle<()> {
        let interval = config.cluster_poll_interval;
        let perform_initial = config.perform_initial_poll;

        tracing::info!(
            "Scheduling DX cluster polling (interval: {}s, initial: {})",
            interval.as_secs(),
            perform_initial
        );

        cluster.spawn_polling(interval, perform_initial)
    }

    /// Stop every pipeline. Nothing mutates pipeline state once this returns.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        if let Some(cluster) = &self.cluster {
            cluster.close();
        }
        for handle in self.task_handles {
            handle.abort();
            let _ = handle.await;
        }
        self.pskreporter.shutdown().await;

        tracing::info!("All scheduled tasks stopped");
    }
}
