//! Seam between the config stores and whatever holds the authoritative copy.
//!
//! [`ConfigRemote`] is implemented by the HTTP client in
//! `adapters::http_remote` and by [`MemoryRemote`] for in-process use.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::domain::ConfigEntityKind;
use crate::error::RemoteError;
use crate::telemetry::{PerformanceReport, RecentTrade, SystemStatus};

pub use memory::{MemoryRemote, RemoteOp};

#[async_trait]
pub trait ConfigRemote: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Every record of a kind as raw JSON objects. Singleton kinds yield at most one.
    async fn list(&self, kind: ConfigEntityKind) -> Result<Vec<Json>, RemoteError>;

    /// Commit a new record (`POST` for keyed kinds, `PUT` for singletons).
    /// Returns whatever body the server answered with.
    async fn create(&self, kind: ConfigEntityKind, payload: &Json) -> Result<Json, RemoteError>;

    /// Commit a full replacement of an existing record
    async fn update(
        &self,
        kind: ConfigEntityKind,
        key: &str,
        payload: &Json,
    ) -> Result<Json, RemoteError>;
}

/// Read-only operational telemetry
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn system_status(&self) -> Result<SystemStatus, RemoteError>;

    async fn recent_trades(&self) -> Result<Vec<RecentTrade>, RemoteError>;

    async fn performance(&self) -> Result<PerformanceReport, RemoteError>;
}

/// Normalize a list response: arrays pass through, a singleton object becomes a
/// one-element list, and an empty object or `null` means nothing is stored yet.
pub fn normalize_list(kind: ConfigEntityKind, body: Json) -> Result<Vec<Json>, RemoteError> {
    match body {
        Json::Array(items) => Ok(items),
        Json::Null => Ok(Vec::new()),
        Json::Object(obj) if kind.is_singleton() => {
            if obj.values().all(Json::is_null) {
                Ok(Vec::new())
            } else {
                Ok(vec![Json::Object(obj)])
            }
        }
        Json::Object(mut obj) => {
            // Some deployments wrap collections: {"items": [...]} / {"data": [...]}
            for wrapper in ["items", "data", kind.path().trim_start_matches('/')] {
                if let Some(Json::Array(items)) = obj.remove(wrapper) {
                    return Ok(items);
                }
            }
            Err(RemoteError::Decode(format!(
                "expected a list of {} records, got an object",
                kind
            )))
        }
        other => Err(RemoteError::Decode(format!(
            "expected a list of {} records, got {}",
            kind, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_list_handles_singletons_and_wrappers() {
        let items = normalize_list(ConfigEntityKind::Broker, json!([{ "name": "a" }]))
            .expect("array");
        assert_eq!(items.len(), 1);

        let wrapped = normalize_list(
            ConfigEntityKind::Instrument,
            json!({ "stocks": [{ "symbol": "A" }, { "symbol": "B" }] }),
        )
        .expect("wrapped");
        assert_eq!(wrapped.len(), 2);

        let single = normalize_list(ConfigEntityKind::RiskPolicy, json!({ "maxLeverage": 2 }))
            .expect("singleton");
        assert_eq!(single.len(), 1);

        let unset = normalize_list(ConfigEntityKind::RiskPolicy, json!({})).expect("empty");
        assert!(unset.is_empty());

        assert!(normalize_list(ConfigEntityKind::Broker, json!("nope")).is_err());
    }
}
