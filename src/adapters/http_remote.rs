//! REST client for the trading platform's configuration API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::ConfigEntityKind;
use crate::error::{ConsoleError, RemoteError, Result};
use crate::remote::{normalize_list, ConfigRemote, TelemetrySource};
use crate::telemetry::{PerformanceReport, RecentTrade, SystemStatus};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

#[derive(Clone)]
pub struct HttpRemote {
    http: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: Option<&str>, auth_token: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| ConsoleError::InvalidInput(format!("invalid API URL '{}': {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = auth_token.filter(|t| !t.trim().is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| ConsoleError::InvalidInput(format!("invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .user_agent("ats-console/0.1")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(
            Some(&config.base_url),
            config.auth_token.as_deref(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record_path(kind: ConfigEntityKind, key: &str) -> String {
        if kind.is_singleton() {
            kind.path().to_string()
        } else {
            format!("{}/{}", kind.path(), urlencoding::encode(key))
        }
    }

    async fn request_json(&self, method: Method, path: &str, body: Option<&Json>) -> std::result::Result<Json, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "config api request");

        let mut req = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Json::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Decode(format!("{} {}: {}", method, path, e)))
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, RemoteError> {
        let body = self.request_json(Method::GET, path, None).await?;
        serde_json::from_value(body).map_err(|e| RemoteError::Decode(format!("GET {}: {}", path, e)))
    }
}

#[async_trait]
impl ConfigRemote for HttpRemote {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn list(&self, kind: ConfigEntityKind) -> std::result::Result<Vec<Json>, RemoteError> {
        let body = self.request_json(Method::GET, kind.path(), None).await?;
        normalize_list(kind, body)
    }

    async fn create(&self, kind: ConfigEntityKind, payload: &Json) -> std::result::Result<Json, RemoteError> {
        let method = if kind.is_singleton() {
            Method::PUT
        } else {
            Method::POST
        };
        self.request_json(method, kind.path(), Some(payload)).await
    }

    async fn update(
        &self,
        kind: ConfigEntityKind,
        key: &str,
        payload: &Json,
    ) -> std::result::Result<Json, RemoteError> {
        let path = Self::record_path(kind, key);
        self.request_json(Method::PUT, &path, Some(payload)).await
    }
}

#[async_trait]
impl TelemetrySource for HttpRemote {
    async fn system_status(&self) -> std::result::Result<SystemStatus, RemoteError> {
        self.get_typed("/system/status").await
    }

    async fn recent_trades(&self) -> std::result::Result<Vec<RecentTrade>, RemoteError> {
        let body = self.request_json(Method::GET, "/trades/recent", None).await?;
        match body {
            Json::Null => Ok(Vec::new()),
            other => serde_json::from_value(other)
                .map_err(|e| RemoteError::Decode(format!("GET /trades/recent: {}", e))),
        }
    }

    async fn performance(&self) -> std::result::Result<PerformanceReport, RemoteError> {
        self.get_typed("/performance").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_paths_follow_the_route_table() {
        assert_eq!(
            HttpRemote::record_path(ConfigEntityKind::Instrument, "BRK.B"),
            "/stocks/BRK.B"
        );
        assert_eq!(
            HttpRemote::record_path(ConfigEntityKind::Strategy, "mean rev"),
            "/trading-strategies/mean%20rev"
        );
        assert_eq!(
            HttpRemote::record_path(ConfigEntityKind::SystemSettings, "system-settings"),
            "/system-settings"
        );
    }

    #[test]
    fn new_rejects_malformed_base_urls() {
        assert!(HttpRemote::new(Some("not a url"), None, Duration::from_secs(1)).is_err());
        let remote = HttpRemote::new(Some("http://localhost:9000/api/"), Some("t"), Duration::from_secs(1))
            .expect("valid url");
        assert_eq!(remote.base_url(), "http://localhost:9000/api");
    }
}
