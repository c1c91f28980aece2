//! Authoritative in-memory configuration store.
//!
//! Backs the reference REST service (`api`) and [`crate::remote::MemoryRemote`].
//! Every write is validated with the same schema registry the console uses, so
//! a record that reaches this store is always well-formed.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::ConfigEntityKind;
use crate::error::{ConsoleError, FieldError, ValidationErrors};
use crate::schema;
use crate::telemetry::{PerformanceReport, RecentTrade, SeriesPoint, SystemStatus};

/// Fields this service derives itself; ignored when clients echo them back
const DERIVED_FIELDS: &[&str] = &["updatedAt", "updated_at", "id"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    Invalid(ValidationErrors),

    #[error("{kind} '{key}' not found")]
    NotFound {
        kind: ConfigEntityKind,
        key: String,
    },

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ServiceError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Invalid(_) => 422,
            Self::NotFound { .. } => 404,
            Self::BadRequest(_) => 400,
        }
    }

    /// JSON error body the REST layer returns
    pub fn body(&self) -> Json {
        match self {
            Self::Invalid(errors) => json!({
                "detail": self.to_string(),
                "errors": errors.errors,
            }),
            _ => json!({ "detail": self.to_string() }),
        }
    }
}

/// Initial content for a service started from a file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSeed {
    /// Kind name (`stocks`, `brokers`, `risk-management`, ...) to records
    #[serde(default)]
    pub records: BTreeMap<String, Vec<Json>>,
    #[serde(default)]
    pub trades: Vec<RecentTrade>,
    #[serde(default)]
    pub equity: Vec<SeriesPoint>,
}

impl ServiceSeed {
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Default)]
pub struct ConfigService {
    records: RwLock<HashMap<ConfigEntityKind, BTreeMap<String, Json>>>,
    trades: RwLock<Vec<RecentTrade>>,
    equity: RwLock<Vec<SeriesPoint>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// List response body: an array for keyed kinds, the object (or `{}`) for singletons
    pub async fn list(&self, kind: ConfigEntityKind) -> Json {
        let records = self.records.read().await;
        let stored = records.get(&kind);
        if kind.is_singleton() {
            return stored
                .and_then(|m| m.values().next().cloned())
                .unwrap_or_else(|| json!({}));
        }
        Json::Array(stored.map(|m| m.values().cloned().collect()).unwrap_or_default())
    }

    pub async fn get(&self, kind: ConfigEntityKind, key: &str) -> Option<Json> {
        self.records
            .read()
            .await
            .get(&kind)
            .and_then(|m| m.get(key).cloned())
    }

    /// Insert or replace by key (POST on keyed kinds, PUT on singletons)
    pub async fn upsert(&self, kind: ConfigEntityKind, payload: &Json) -> Result<Json, ServiceError> {
        let (key, canonical) = canonicalize(kind, payload)?;
        let mut records = self.records.write().await;
        let replaced = records
            .entry(kind)
            .or_default()
            .insert(key.clone(), canonical.clone())
            .is_some();
        info!(kind = %kind, key = %key, replaced, "config record stored");
        Ok(canonical)
    }

    /// Replace an existing keyed record (PUT /{kind}/{key})
    pub async fn replace(
        &self,
        kind: ConfigEntityKind,
        key: &str,
        payload: &Json,
    ) -> Result<Json, ServiceError> {
        if kind.is_singleton() {
            return self.upsert(kind, payload).await;
        }

        let mut payload = payload.clone();
        if let (Some(obj), Some(field)) = (payload.as_object_mut(), kind.key_field()) {
            match obj.get(field).and_then(Json::as_str) {
                Some(in_body) if in_body != key => {
                    return Err(ServiceError::Invalid(ValidationErrors::single(
                        kind,
                        FieldError::key_mismatch(field, key, in_body),
                    )));
                }
                Some(_) => {}
                None => {
                    obj.insert(field.to_string(), Json::String(key.to_string()));
                }
            }
        }

        let (resolved, canonical) = canonicalize(kind, &payload)?;
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(&kind)
            .and_then(|m| m.get_mut(&resolved))
            .ok_or_else(|| ServiceError::NotFound {
                kind,
                key: key.to_string(),
            })?;
        *slot = canonical.clone();
        info!(kind = %kind, key = %resolved, "config record replaced");
        Ok(canonical)
    }

    pub async fn record_trade(&self, trade: RecentTrade) {
        self.trades.write().await.push(trade);
    }

    pub async fn record_equity(&self, point: SeriesPoint) {
        self.equity.write().await.push(point);
    }

    pub async fn system_status(&self) -> SystemStatus {
        let records = self.records.read().await;
        let active_stocks_count = records
            .get(&ConfigEntityKind::Instrument)
            .map(|m| {
                m.values()
                    .filter(|r| schema::active_flag_of(r).unwrap_or(true))
                    .count() as u64
            })
            .unwrap_or_default();
        let is_active = records
            .get(&ConfigEntityKind::SystemSettings)
            .and_then(|m| m.values().next())
            .and_then(schema::active_flag_of)
            .unwrap_or(true);
        SystemStatus {
            is_active,
            cpu_usage: None,
            memory_usage: None,
            active_stocks_count,
        }
    }

    /// Most recent trades first
    pub async fn recent_trades(&self, limit: usize) -> Vec<RecentTrade> {
        let mut trades = self.trades.read().await.clone();
        trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        trades.truncate(limit);
        trades
    }

    pub async fn performance(&self) -> PerformanceReport {
        let equity = self.equity.read().await.clone();
        let trades = self.trades.read().await.clone();
        PerformanceReport::from_equity(equity, trades)
    }

    /// Load seed content; every record goes through normal validation
    pub async fn apply_seed(&self, seed: ServiceSeed) -> crate::error::Result<usize> {
        let mut stored = 0;
        for (name, items) in seed.records {
            let kind: ConfigEntityKind = name.parse()?;
            for item in items {
                self.upsert(kind, &item)
                    .await
                    .map_err(|e| ConsoleError::InvalidInput(format!("seed {}: {}", name, e)))?;
                stored += 1;
            }
        }
        let trades = seed.trades.len();
        for trade in seed.trades {
            self.record_trade(trade).await;
        }
        for point in seed.equity {
            self.record_equity(point).await;
        }
        debug!(records = stored, trades, "seed applied");
        Ok(stored)
    }
}

fn canonicalize(kind: ConfigEntityKind, payload: &Json) -> Result<(String, Json), ServiceError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ServiceError::BadRequest(format!("{} payload must be an object", kind)))?;
    let submitted: Map<String, Json> = obj
        .iter()
        .filter(|(k, _)| !DERIVED_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let attrs = schema::attributes_from_json(kind, &submitted);
    let validated =
        schema::validate(kind, &schema::with_defaults(kind, &attrs)).map_err(ServiceError::Invalid)?;
    let is_active = schema::active_flag(&submitted).unwrap_or(true);

    let key = validated.key.clone();
    let mut record = validated.into_record(is_active);
    record
        .extra
        .insert("updatedAt".to_string(), Json::String(Utc::now().to_rfc3339()));
    Ok((key, record.to_json()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> Json {
        json!({
            "symbol": "AAPL",
            "maxPositionSize": 100,
            "riskFactor": 0.02,
            "isActive": true
        })
    }

    #[tokio::test]
    async fn upsert_fills_defaults_and_stamps_records() {
        let service = ConfigService::new();
        let stored = service
            .upsert(ConfigEntityKind::Instrument, &aapl())
            .await
            .expect("valid instrument");

        assert_eq!(stored["tradingHours"], json!({ "start": "09:30", "end": "16:00" }));
        assert_eq!(stored["minimumVolume"], json!(0));
        assert!(stored["updatedAt"].is_string());

        let listed = service.list(ConfigEntityKind::Instrument).await;
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected_with_422() {
        let service = ConfigService::new();
        let err = service
            .upsert(
                ConfigEntityKind::Strategy,
                &json!({ "name": "S1", "type": "momentum", "parameters": {} }),
            )
            .await
            .expect_err("momentum without parameters");
        assert_eq!(err.status(), 422);
        assert!(err.body()["errors"].to_string().contains("lookback_period"));
    }

    #[tokio::test]
    async fn replace_requires_existing_key_and_matching_body() {
        let service = ConfigService::new();
        let err = service
            .replace(ConfigEntityKind::Instrument, "AAPL", &aapl())
            .await
            .expect_err("not created yet");
        assert_eq!(err.status(), 404);

        service
            .upsert(ConfigEntityKind::Instrument, &aapl())
            .await
            .expect("create");
        let err = service
            .replace(ConfigEntityKind::Instrument, "MSFT", &aapl())
            .await
            .expect_err("body names a different key");
        assert_eq!(err.status(), 422);

        let mut off = aapl();
        off["isActive"] = json!(false);
        off["updatedAt"] = json!("stale");
        let replaced = service
            .replace(ConfigEntityKind::Instrument, "AAPL", &off)
            .await
            .expect("replace");
        assert_eq!(replaced["isActive"], json!(false));
        assert_ne!(replaced["updatedAt"], json!("stale"));
    }

    #[tokio::test]
    async fn singleton_list_is_an_object() {
        let service = ConfigService::new();
        assert_eq!(service.list(ConfigEntityKind::RiskPolicy).await, json!({}));
        service
            .upsert(
                ConfigEntityKind::RiskPolicy,
                &json!({ "maxLeverage": 2, "riskPerTrade": 0.01 }),
            )
            .await
            .expect("risk policy");
        let listed = service.list(ConfigEntityKind::RiskPolicy).await;
        assert_eq!(listed["maxLeverage"], json!(2));
        assert_eq!(listed["maxDrawdown"], json!(0.2));
    }

    #[tokio::test]
    async fn status_counts_active_instruments() {
        let service = ConfigService::new();
        service
            .upsert(ConfigEntityKind::Instrument, &aapl())
            .await
            .expect("aapl");
        let mut msft = aapl();
        msft["symbol"] = json!("MSFT");
        msft["isActive"] = json!(false);
        service
            .upsert(ConfigEntityKind::Instrument, &msft)
            .await
            .expect("msft");

        let status = service.system_status().await;
        assert_eq!(status.active_stocks_count, 1);
        assert!(status.is_active);
    }

    #[tokio::test]
    async fn example_seed_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/seed.example.json");
        let seed = ServiceSeed::from_file(&path).expect("seed parses");
        let service = ConfigService::new();
        let stored = service.apply_seed(seed).await.expect("seed validates");
        assert_eq!(stored, 6);

        assert_eq!(service.system_status().await.active_stocks_count, 1);
        assert_eq!(service.recent_trades(1).await[0].action, "SELL");
        let report = service.performance().await;
        assert_eq!(report.equity.len(), 3);
        assert!(report.max_drawdown() < 0.0);
    }

    #[tokio::test]
    async fn seed_with_invalid_record_is_rejected() {
        let seed: ServiceSeed = serde_json::from_value(json!({
            "records": { "brokers": [{ "name": "x", "maxOrderSize": 0 }] }
        }))
        .expect("seed shape");
        let err = ConfigService::new().apply_seed(seed).await.expect_err("invalid broker");
        assert!(err.to_string().contains("brokers"));
    }
}
