use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::services::ConfigService;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Authoritative record storage
    pub service: Arc<ConfigService>,

    /// Bearer token required on writes; open when unset
    pub auth_token: Option<Arc<str>>,

    /// Application start time
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(service: Arc<ConfigService>) -> Self {
        Self {
            service,
            auth_token: None,
            start_time: Utc::now(),
        }
    }

    pub fn with_auth_token(mut self, token: Option<&str>) -> Self {
        self.auth_token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Arc::from);
        self
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
