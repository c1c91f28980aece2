//! Config Store driving the reference API over real HTTP.

use ats_console::api::{create_router, AppState};
use ats_console::domain::{Attributes, ConfigEntityKind, RecordPatch, Value};
use ats_console::error::CommitError;
use ats_console::remote::TelemetrySource;
use ats_console::services::ConfigService;
use ats_console::store::{ConfigStore, SyncState};
use ats_console::telemetry::RecentTrade;
use ats_console::HttpRemote;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = create_router(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}/api", addr)
}

fn remote(base_url: &str, token: Option<&str>) -> Arc<HttpRemote> {
    Arc::new(HttpRemote::new(Some(base_url), token, Duration::from_secs(5)).expect("client"))
}

fn aapl() -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("symbol".into(), Value::text("AAPL"));
    attrs.insert("maxPositionSize".into(), Value::Number(100.0));
    attrs.insert("riskFactor".into(), Value::Number(0.02));
    attrs
}

#[tokio::test]
async fn create_list_and_toggle_round_trip() {
    let service = Arc::new(ConfigService::new());
    let base = spawn_server(AppState::new(service.clone())).await;
    let store = ConfigStore::new(
        ConfigEntityKind::Instrument,
        remote(&base, None),
        Duration::from_secs(5),
    );

    store.load().await.expect("empty load");
    let created = store.create(aapl()).await.expect("create");
    assert_eq!(created.key, "AAPL");

    let listed = store.load().await.expect("reload");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, "AAPL");

    let off = store.toggle_active("AAPL").await.expect("toggle");
    assert!(!off.is_active);
    let on = store.toggle_active("AAPL").await.expect("toggle back");
    assert!(on.is_active);
    assert_eq!(on.attributes, created.attributes);
    assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);

    let stored = service
        .get(ConfigEntityKind::Instrument, "AAPL")
        .await
        .expect("server copy");
    assert_eq!(stored["isActive"], true);
}

#[tokio::test]
async fn singleton_commits_go_to_the_bare_path() {
    let base = spawn_server(AppState::new(Arc::new(ConfigService::new()))).await;
    let store = ConfigStore::new(
        ConfigEntityKind::RiskPolicy,
        remote(&base, None),
        Duration::from_secs(5),
    );

    let mut attrs = Attributes::new();
    attrs.insert("maxLeverage".into(), Value::Number(3.0));
    attrs.insert("riskPerTrade".into(), Value::Number(0.01));
    let created = store.create(attrs).await.expect("create singleton");
    assert_eq!(created.key, "risk-management");

    let patch = RecordPatch::new().set("maxLeverage", Value::Number(1.5));
    let updated = store
        .update("risk-management", patch)
        .await
        .expect("update singleton");
    assert_eq!(updated.get("maxLeverage"), Some(&Value::Number(1.5)));
    assert_eq!(store.records().await.len(), 1);
}

#[tokio::test]
async fn rejected_commit_rolls_back() {
    let base = spawn_server(
        AppState::new(Arc::new(ConfigService::new())).with_auth_token(Some("s3cret")),
    )
    .await;
    let authorized = ConfigStore::new(
        ConfigEntityKind::Instrument,
        remote(&base, Some("s3cret")),
        Duration::from_secs(5),
    );
    authorized.create(aapl()).await.expect("authorized create");

    let anonymous = ConfigStore::new(
        ConfigEntityKind::Instrument,
        remote(&base, None),
        Duration::from_secs(5),
    );
    anonymous.load().await.expect("reads are open");

    let err = anonymous
        .toggle_active("AAPL")
        .await
        .expect_err("writes need the token");
    assert!(matches!(err, CommitError::Status { status: 401, .. }));
    let record = anonymous.get("AAPL").await.expect("still listed");
    assert!(record.is_active);
    assert!(anonymous.last_error().await.is_some());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    // bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let store = ConfigStore::new(
        ConfigEntityKind::Broker,
        remote(&format!("http://{}/api", addr), None),
        Duration::from_secs(2),
    );
    let err = store.load().await.expect_err("nothing listening");
    assert!(matches!(
        err,
        ats_console::FetchError::Transport { .. } | ats_console::FetchError::Timeout { .. }
    ));
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn telemetry_is_read_over_http() {
    let service = Arc::new(ConfigService::new());
    service
        .record_trade(RecentTrade {
            symbol: "AAPL".into(),
            action: "BUY".into(),
            price: 187.5,
            quantity: Some(10.0),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap(),
        })
        .await;
    let base = spawn_server(AppState::new(service)).await;
    let client = remote(&base, None);

    let trades = client.recent_trades().await.expect("trades");
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].symbol, "AAPL");

    let status = client.system_status().await.expect("status");
    assert_eq!(status.active_stocks_count, 0);
    assert!(status.cpu_usage.is_none());

    let report = client.performance().await.expect("performance");
    assert_eq!(report.trades.len(), 1);
}
