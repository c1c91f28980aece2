//! Operator console: one Config Store per entity kind plus the telemetry views.

pub mod editor;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::HttpRemote;
use crate::config::ApiConfig;
use crate::domain::ConfigEntityKind;
use crate::error::{FetchError, Result};
use crate::remote::{ConfigRemote, MemoryRemote, TelemetrySource};
use crate::store::ConfigStore;

pub use editor::RecordDraft;

/// Outcome of loading one kind during [`Console::load_all`]
#[derive(Debug)]
pub struct LoadReport {
    pub kind: ConfigEntityKind,
    pub result: std::result::Result<usize, FetchError>,
}

pub struct Console {
    stores: Vec<Arc<ConfigStore>>,
    telemetry: Arc<dyn TelemetrySource>,
    source: String,
}

impl Console {
    pub fn new<R>(remote: Arc<R>, timeout: Duration) -> Self
    where
        R: ConfigRemote + TelemetrySource + 'static,
    {
        let source = remote.name().to_string();
        let config_remote: Arc<dyn ConfigRemote> = remote.clone();
        let stores = ConfigEntityKind::ALL
            .iter()
            .map(|kind| Arc::new(ConfigStore::new(*kind, config_remote.clone(), timeout)))
            .collect();
        Self {
            stores,
            telemetry: remote,
            source,
        }
    }

    /// Console talking to the REST API described by `config`
    pub fn connect(config: &ApiConfig) -> Result<Self> {
        let remote = Arc::new(HttpRemote::from_config(config)?);
        info!(base_url = remote.base_url(), "console using REST API");
        Ok(Self::new(remote, config.request_timeout()))
    }

    /// Console backed by an in-process service
    pub fn offline(remote: Arc<MemoryRemote>, timeout: Duration) -> Self {
        info!("console running offline against in-memory service");
        Self::new(remote, timeout)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn store(&self, kind: ConfigEntityKind) -> &Arc<ConfigStore> {
        &self.stores[kind.index()]
    }

    pub fn stores(&self) -> impl Iterator<Item = &Arc<ConfigStore>> {
        self.stores.iter()
    }

    pub fn telemetry(&self) -> &dyn TelemetrySource {
        self.telemetry.as_ref()
    }

    /// Load every kind concurrently. One kind failing does not affect the others.
    pub async fn load_all(&self) -> Vec<LoadReport> {
        let loads = self.stores.iter().map(|store| async move {
            LoadReport {
                kind: store.kind(),
                result: store.load().await.map(|records| records.len()),
            }
        });
        let reports = join_all(loads).await;
        for report in &reports {
            if let Err(err) = &report.result {
                warn!(kind = %report.kind, error = %err, "initial load failed");
            }
        }
        reports
    }
}
