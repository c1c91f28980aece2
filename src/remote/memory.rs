use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as Json;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{normalize_list, ConfigRemote, TelemetrySource};
use crate::domain::ConfigEntityKind;
use crate::error::RemoteError;
use crate::services::{ConfigService, ServiceError};
use crate::telemetry::{PerformanceReport, RecentTrade, SystemStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    List,
    Create,
    Update,
}

struct Fault {
    kind: ConfigEntityKind,
    op: RemoteOp,
    error: RemoteError,
}

/// In-process remote backed by a [`ConfigService`].
///
/// Used for `--offline` sessions and tests. Failures and latency can be
/// injected, and commits in flight per key are tracked.
pub struct MemoryRemote {
    service: Arc<ConfigService>,
    faults: Mutex<Vec<Fault>>,
    latency_ms: AtomicU64,
    list_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    in_flight: DashMap<(ConfigEntityKind, String), usize>,
    max_in_flight_per_key: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_service(Arc::new(ConfigService::new()))
    }

    pub fn with_service(service: Arc<ConfigService>) -> Self {
        Self {
            service,
            faults: Mutex::new(Vec::new()),
            latency_ms: AtomicU64::new(0),
            list_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            in_flight: DashMap::new(),
            max_in_flight_per_key: AtomicUsize::new(0),
        }
    }

    pub fn service(&self) -> &Arc<ConfigService> {
        &self.service
    }

    /// Make the next matching call fail with `error`
    pub async fn fail_next(&self, kind: ConfigEntityKind, op: RemoteOp, error: RemoteError) {
        self.faults.lock().await.push(Fault { kind, op, error });
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous commits ever seen for a single key
    pub fn max_in_flight_per_key(&self) -> usize {
        self.max_in_flight_per_key.load(Ordering::SeqCst)
    }

    async fn simulate(&self, kind: ConfigEntityKind, op: RemoteOp) -> Result<(), RemoteError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let mut faults = self.faults.lock().await;
        if let Some(pos) = faults.iter().position(|f| f.kind == kind && f.op == op) {
            return Err(faults.remove(pos).error);
        }
        Ok(())
    }

    async fn commit<F, Fut>(
        &self,
        kind: ConfigEntityKind,
        key: String,
        op: RemoteOp,
        apply: F,
    ) -> Result<Json, RemoteError>
    where
        F: FnOnce(Arc<ConfigService>) -> Fut,
        Fut: std::future::Future<Output = Result<Json, ServiceError>>,
    {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let slot = (kind, key);
        let current = {
            let mut entry = self.in_flight.entry(slot.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.max_in_flight_per_key
            .fetch_max(current, Ordering::SeqCst);

        // decremented on drop so a caller-side timeout still releases the slot
        let _slot = InFlight {
            map: &self.in_flight,
            slot,
        };

        match self.simulate(kind, op).await {
            Ok(()) => apply(self.service.clone()).await.map_err(service_error),
            Err(e) => Err(e),
        }
    }
}

struct InFlight<'a> {
    map: &'a DashMap<(ConfigEntityKind, String), usize>,
    slot: (ConfigEntityKind, String),
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(mut entry) = self.map.get_mut(&self.slot) {
            *entry = entry.saturating_sub(1);
        }
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn service_error(err: ServiceError) -> RemoteError {
    RemoteError::Status {
        status: err.status(),
        body: err.body().to_string(),
    }
}

fn payload_key(kind: ConfigEntityKind, payload: &Json) -> String {
    match kind.key_field() {
        Some(field) => payload
            .get(field)
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
        None => kind.singleton_key().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl ConfigRemote for MemoryRemote {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list(&self, kind: ConfigEntityKind) -> Result<Vec<Json>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate(kind, RemoteOp::List).await?;
        normalize_list(kind, self.service.list(kind).await)
    }

    async fn create(&self, kind: ConfigEntityKind, payload: &Json) -> Result<Json, RemoteError> {
        let key = payload_key(kind, payload);
        let payload = payload.clone();
        self.commit(kind, key, RemoteOp::Create, |service| async move {
            service.upsert(kind, &payload).await
        })
        .await
    }

    async fn update(
        &self,
        kind: ConfigEntityKind,
        key: &str,
        payload: &Json,
    ) -> Result<Json, RemoteError> {
        let owned_key = key.to_string();
        let payload = payload.clone();
        self.commit(kind, key.to_string(), RemoteOp::Update, |service| async move {
            service.replace(kind, &owned_key, &payload).await
        })
        .await
    }
}

#[async_trait]
impl TelemetrySource for MemoryRemote {
    async fn system_status(&self) -> Result<SystemStatus, RemoteError> {
        Ok(self.service.system_status().await)
    }

    async fn recent_trades(&self) -> Result<Vec<RecentTrade>, RemoteError> {
        Ok(self.service.recent_trades(20).await)
    }

    async fn performance(&self) -> Result<PerformanceReport, RemoteError> {
        Ok(self.service.performance().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let remote = MemoryRemote::new();
        remote
            .fail_next(
                ConfigEntityKind::Broker,
                RemoteOp::List,
                RemoteError::Transport("refused".to_string()),
            )
            .await;

        assert!(remote.list(ConfigEntityKind::Broker).await.is_err());
        assert!(remote.list(ConfigEntityKind::Instrument).await.is_ok());
        assert!(remote.list(ConfigEntityKind::Broker).await.is_ok());
        assert_eq!(remote.list_calls(), 3);
    }

    #[tokio::test]
    async fn service_rejections_surface_as_status_errors() {
        let remote = MemoryRemote::new();
        let err = remote
            .update(
                ConfigEntityKind::Broker,
                "ibkr",
                &json!({ "name": "ibkr", "apiKey": "k", "apiSecret": "s", "maxOrderSize": 10 }),
            )
            .await
            .expect_err("unknown broker");
        assert!(matches!(err, RemoteError::Status { status: 404, .. }));
        assert_eq!(remote.commit_calls(), 1);
        assert_eq!(remote.max_in_flight_per_key(), 1);
    }
}
