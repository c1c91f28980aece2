//! Read-only operational telemetry: system status, recent trades, and the
//! equity / returns / drawdown series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub active_stocks_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTrade {
    pub symbol: String,
    pub action: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: String,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    #[serde(default)]
    pub equity: Vec<SeriesPoint>,
    #[serde(default)]
    pub returns: Vec<SeriesPoint>,
    #[serde(default)]
    pub drawdown: Vec<SeriesPoint>,
    #[serde(default)]
    pub trades: Vec<RecentTrade>,
}

impl PerformanceReport {
    /// Derive period returns and drawdown from an equity curve
    pub fn from_equity(equity: Vec<SeriesPoint>, trades: Vec<RecentTrade>) -> Self {
        let returns = equity
            .windows(2)
            .filter(|pair| pair[0].value != 0.0)
            .map(|pair| SeriesPoint::new(pair[1].date.clone(), pair[1].value / pair[0].value - 1.0))
            .collect();

        let mut peak = f64::MIN;
        let drawdown = equity
            .iter()
            .map(|point| {
                peak = peak.max(point.value);
                let dd = if peak > 0.0 { point.value / peak - 1.0 } else { 0.0 };
                SeriesPoint::new(point.date.clone(), dd)
            })
            .collect();

        Self {
            equity,
            returns,
            drawdown,
            trades,
        }
    }

    /// Deepest drawdown as a non-positive fraction
    pub fn max_drawdown(&self) -> f64 {
        self.drawdown
            .iter()
            .map(|p| p.value)
            .fold(0.0, f64::min)
    }

    pub fn total_return(&self) -> Option<f64> {
        let first = self.equity.first()?.value;
        let last = self.equity.last()?.value;
        (first != 0.0).then(|| last / first - 1.0)
    }
}
