//! Config Store - 每個實體種類一個
//!
//! Holds the last known records of one kind, applies mutations
//! optimistically and reconciles them with the server:
//! - create / update / toggle show up immediately as `Pending`
//! - success replaces the optimistic value with the server's answer, then reloads
//! - failure restores the last committed value and records `last_error`
//! - commits on the same key are serialized, different keys run freely

pub mod sync;

use serde_json::Value as Json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{Attributes, ConfigEntityKind, ConfigRecord, RecordPatch};
use crate::error::{CommitError, FetchError, FieldError, RemoteError, StoreError, ValidationErrors};
use crate::remote::ConfigRemote;
use crate::schema::{self, decode_record};

pub use sync::{SyncOp, SyncState};
use sync::{KeyLocks, Ledger};

struct StoreInner {
    ledger: Ledger,
    last_error: Option<StoreError>,
}

pub struct ConfigStore {
    kind: ConfigEntityKind,
    remote: Arc<dyn ConfigRemote>,
    timeout: Duration,
    inner: RwLock<StoreInner>,
    locks: KeyLocks,
}

impl ConfigStore {
    pub fn new(kind: ConfigEntityKind, remote: Arc<dyn ConfigRemote>, timeout: Duration) -> Self {
        Self {
            kind,
            remote,
            timeout,
            inner: RwLock::new(StoreInner {
                ledger: Ledger::default(),
                last_error: None,
            }),
            locks: KeyLocks::default(),
        }
    }

    pub fn kind(&self) -> ConfigEntityKind {
        self.kind
    }

    // ==================== Observers ====================

    /// Current records, sorted by key. Pending values included.
    pub async fn records(&self) -> Vec<ConfigRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<ConfigRecord> = inner.ledger.records.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    pub async fn get(&self, key: &str) -> Option<ConfigRecord> {
        self.inner.read().await.ledger.records.get(key).cloned()
    }

    pub async fn sync_state(&self, key: &str) -> SyncState {
        self.inner.read().await.ledger.state_of(key)
    }

    pub async fn pending_keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut keys: Vec<String> = inner.ledger.pending.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn last_error(&self) -> Option<StoreError> {
        self.inner.read().await.last_error.clone()
    }

    pub async fn clear_error(&self) {
        self.inner.write().await.last_error = None;
    }

    /// True once a load has succeeded
    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.ledger.loaded
    }

    // ==================== Load ====================

    /// Replace the record set with the server's.
    ///
    /// On failure the previous records stay visible and `last_error` is set.
    pub async fn load(&self) -> Result<Vec<ConfigRecord>, FetchError> {
        let started = Instant::now();
        // Commits settled while the list is in flight are newer than its answer
        let since = self.inner.read().await.ledger.revision();
        let items = match tokio::time::timeout(self.timeout, self.remote.list(self.kind)).await {
            Ok(Ok(items)) => items,
            Ok(Err(err)) => return Err(self.fetch_failed(FetchError::from_remote(self.kind, err)).await),
            Err(_) => {
                let err = FetchError::Timeout {
                    kind: self.kind,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                return Err(self.fetch_failed(err).await);
            }
        };

        let mut snapshot = HashMap::with_capacity(items.len());
        for item in &items {
            match decode_record(self.kind, item) {
                Ok(record) => {
                    if snapshot.contains_key(&record.key) {
                        warn!(kind = %self.kind, key = %record.key, "duplicate key in server list, keeping the later one");
                    }
                    snapshot.insert(record.key.clone(), record);
                }
                Err(reason) => {
                    warn!(kind = %self.kind, %reason, "skipping undecodable server record");
                }
            }
        }

        {
            let mut inner = self.inner.write().await;
            inner.ledger.replace_snapshot(snapshot, since);
            if matches!(inner.last_error, Some(StoreError::Fetch(_))) {
                inner.last_error = None;
            }
        }

        let records = self.records().await;
        debug!(
            kind = %self.kind,
            remote = self.remote.name(),
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "records loaded"
        );
        Ok(records)
    }

    async fn fetch_failed(&self, err: FetchError) -> FetchError {
        warn!(kind = %self.kind, error = %err, "load failed, keeping previous records");
        self.inner.write().await.last_error = Some(StoreError::Fetch(err.clone()));
        err
    }

    // ==================== Mutations ====================

    /// Create an active record
    pub async fn create(&self, attributes: Attributes) -> Result<ConfigRecord, CommitError> {
        self.create_with_state(attributes, true).await
    }

    /// Create a record with an explicit active flag.
    ///
    /// Missing optional fields take their schema defaults before validation.
    pub async fn create_with_state(
        &self,
        attributes: Attributes,
        is_active: bool,
    ) -> Result<ConfigRecord, CommitError> {
        let full = schema::with_defaults(self.kind, &attributes);
        let validated = match schema::validate(self.kind, &full) {
            Ok(v) => v,
            Err(errors) => return Err(self.rejected(errors.into()).await),
        };
        let key = validated.key.clone();
        let _guard = self.locks.acquire(&key).await;

        let optimistic = {
            let mut inner = self.inner.write().await;
            if inner.ledger.records.contains_key(&key) {
                drop(inner);
                let err = CommitError::DuplicateKey {
                    kind: self.kind,
                    key,
                };
                return Err(self.rejected(err).await);
            }
            let record = validated.into_record(is_active);
            inner.ledger.begin(SyncOp::Create, record.clone());
            record
        };
        debug!(kind = %self.kind, key = %key, "create applied optimistically");

        let payload = schema::encode_record(&optimistic);
        let outcome = self
            .bounded(&key, self.remote.create(self.kind, &payload))
            .await;
        self.settle(&key, SyncOp::Create, optimistic, outcome).await
    }

    /// Overwrite the given attributes (and optionally the active flag) of an existing record
    pub async fn update(&self, key: &str, patch: RecordPatch) -> Result<ConfigRecord, CommitError> {
        self.mutate(key, SyncOp::Update, move |_| patch).await
    }

    /// Flip `isActive`, leaving every other attribute alone
    pub async fn toggle_active(&self, key: &str) -> Result<ConfigRecord, CommitError> {
        self.mutate(key, SyncOp::Toggle, RecordPatch::toggle_of)
            .await
    }

    /// Shared update path. The patch is built under the key lock so it sees
    /// the outcome of any commit that ran before it.
    async fn mutate<F>(&self, key: &str, op: SyncOp, build: F) -> Result<ConfigRecord, CommitError>
    where
        F: FnOnce(&ConfigRecord) -> RecordPatch,
    {
        let _guard = self.locks.acquire(key).await;

        let Some(current) = self.get(key).await else {
            let err = CommitError::UnknownKey {
                kind: self.kind,
                key: key.to_string(),
            };
            return Err(self.rejected(err).await);
        };
        let patch = build(&current);

        if let Some(field) = self.kind.key_field() {
            if let Some(requested) = patch.attributes.get(field) {
                if requested.as_text() != Some(key) {
                    let errors = ValidationErrors::single(
                        self.kind,
                        FieldError::key_mismatch(field, key, &requested.to_string()),
                    );
                    return Err(self.rejected(errors.into()).await);
                }
            }
        }

        let mut merged = schema::with_defaults(self.kind, &current.attributes);
        merged.extend(patch.attributes);
        let validated = match schema::validate(self.kind, &merged) {
            Ok(v) => v,
            Err(errors) => return Err(self.rejected(errors.into()).await),
        };

        let optimistic = ConfigRecord {
            kind: self.kind,
            key: key.to_string(),
            is_active: patch.is_active.unwrap_or(current.is_active),
            attributes: validated.attributes,
            extra: current.extra.clone(),
        };
        self.inner
            .write()
            .await
            .ledger
            .begin(op, optimistic.clone());
        debug!(kind = %self.kind, key, %op, "change applied optimistically");

        let payload = schema::encode_record(&optimistic);
        let outcome = self
            .bounded(key, self.remote.update(self.kind, key, &payload))
            .await;
        self.settle(key, op, optimistic, outcome).await
    }

    /// Run a remote commit under the configured timeout
    async fn bounded<F>(&self, key: &str, call: F) -> Result<Json, CommitError>
    where
        F: Future<Output = Result<Json, RemoteError>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(err)) => Err(CommitError::from_remote(self.kind, key, err)),
            Err(_) => Err(CommitError::Timeout {
                kind: self.kind,
                key: key.to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }

    /// Resolve a pending commit one way or the other
    async fn settle(
        &self,
        key: &str,
        op: SyncOp,
        optimistic: ConfigRecord,
        outcome: Result<Json, CommitError>,
    ) -> Result<ConfigRecord, CommitError> {
        let body = match outcome {
            Ok(body) => body,
            Err(err) => {
                {
                    let mut inner = self.inner.write().await;
                    inner.ledger.revert(key, err.clone());
                    inner.last_error = Some(StoreError::Commit(err.clone()));
                }
                warn!(kind = %self.kind, key, %op, error = %err, "commit failed, rolled back");
                return Err(err);
            }
        };

        let committed = match decode_record(self.kind, &body) {
            Ok(canonical) if canonical.key == key => {
                if !canonical.same_content(&optimistic) {
                    debug!(kind = %self.kind, key, "server normalized the committed record");
                }
                canonical
            }
            Ok(canonical) => {
                warn!(kind = %self.kind, key, returned = %canonical.key, "server answered with a different key, keeping local value");
                optimistic
            }
            Err(reason) => {
                debug!(kind = %self.kind, key, %reason, "commit response carried no record");
                optimistic
            }
        };
        self.inner.write().await.ledger.confirm(committed.clone());
        info!(kind = %self.kind, key, %op, active = committed.is_active, "commit acknowledged");

        // Reconcile with everything else the server changed. A failed refresh
        // does not undo an acknowledged commit.
        if let Err(err) = self.load().await {
            warn!(kind = %self.kind, key, error = %err, "refresh after commit failed");
        }

        Ok(self.get(key).await.unwrap_or(committed))
    }

    /// Record a failure that happened before anything reached the server
    async fn rejected(&self, err: CommitError) -> CommitError {
        debug!(kind = %self.kind, error = %err, "change rejected locally");
        self.inner.write().await.last_error = Some(StoreError::Commit(err.clone()));
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamValue, TimeRange, Value};
    use crate::error::FieldErrorCode;
    use crate::remote::{MemoryRemote, RemoteOp};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::{assert_err, assert_ok};

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn setup(kind: ConfigEntityKind) -> (Arc<MemoryRemote>, ConfigStore) {
        let remote = Arc::new(MemoryRemote::new());
        let store = ConfigStore::new(kind, remote.clone(), TIMEOUT);
        (remote, store)
    }

    fn aapl() -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("symbol".into(), Value::text("AAPL"));
        attrs.insert("maxPositionSize".into(), Value::Number(1000.0));
        attrs.insert("riskFactor".into(), Value::Number(0.5));
        attrs.insert(
            "tradingHours".into(),
            Value::TimeRange(TimeRange::new("09:30", "16:00")),
        );
        attrs
    }

    fn transport(msg: &str) -> RemoteError {
        RemoteError::Transport(msg.to_string())
    }

    /// Reads the server when a list starts and, once armed, answers late
    struct LaggingList {
        inner: Arc<MemoryRemote>,
        lag_next: AtomicBool,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ConfigRemote for LaggingList {
        fn name(&self) -> &str {
            "lagging"
        }

        async fn list(&self, kind: ConfigEntityKind) -> Result<Vec<Json>, RemoteError> {
            let items = self.inner.list(kind).await?;
            if self.lag_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(self.delay).await;
            }
            Ok(items)
        }

        async fn create(&self, kind: ConfigEntityKind, payload: &Json) -> Result<Json, RemoteError> {
            self.inner.create(kind, payload).await
        }

        async fn update(
            &self,
            kind: ConfigEntityKind,
            key: &str,
            payload: &Json,
        ) -> Result<Json, RemoteError> {
            self.inner.update(kind, key, payload).await
        }
    }

    #[tokio::test]
    async fn create_commits_and_reloads() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        store.load().await.expect("initial load");
        assert!(store.records().await.is_empty());

        let record = store.create(aapl()).await.expect("create");
        assert_eq!(record.key, "AAPL");
        assert!(record.is_active);
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);
        assert!(store.pending_keys().await.is_empty());
        assert!(record.extra.contains_key("updatedAt"));
        assert_eq!(remote.list_calls(), 2);

        let stored = remote.service().get(ConfigEntityKind::Instrument, "AAPL").await;
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn create_is_visible_while_pending() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        let store = Arc::new(store);
        remote.set_latency(Duration::from_millis(100));

        let task = {
            let store = store.clone();
            tokio::spawn(async move { store.create(aapl()).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            store.sync_state("AAPL").await,
            SyncState::Pending(SyncOp::Create)
        );
        assert_eq!(store.pending_keys().await, vec!["AAPL".to_string()]);
        assert!(store.get("AAPL").await.is_some());

        task.await.expect("join").expect("create");
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);
    }

    #[tokio::test]
    async fn create_failure_removes_optimistic_record() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        remote
            .fail_next(ConfigEntityKind::Instrument, RemoteOp::Create, transport("refused"))
            .await;

        let err = store.create(aapl()).await.expect_err("transport failure");
        assert!(matches!(err, CommitError::Transport { .. }));
        assert!(store.get("AAPL").await.is_none());
        assert!(matches!(store.sync_state("AAPL").await, SyncState::Failed(_)));
        assert!(matches!(
            store.last_error().await,
            Some(StoreError::Commit(CommitError::Transport { .. }))
        ));
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_the_server() {
        let (remote, store) = setup(ConfigEntityKind::Strategy);
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), Value::text("mom"));
        attrs.insert("type".into(), Value::text("momentum"));
        attrs.insert("parameters".into(), Value::ParameterMap(BTreeMap::new()));

        let err = store.create(attrs).await.expect_err("missing params");
        match err {
            CommitError::Validation(errors) => {
                assert!(errors.has("lookback_period", FieldErrorCode::MissingField));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(remote.commit_calls(), 0);
        assert!(store.last_error().await.is_some());
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_existing_key() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        store.create(aapl()).await.expect("first create");
        let err = store.create(aapl()).await.expect_err("duplicate");
        assert!(matches!(err, CommitError::DuplicateKey { .. }));
        assert_eq!(remote.commit_calls(), 1);
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);
    }

    #[tokio::test]
    async fn toggle_twice_restores_flag_and_attributes() {
        let (_remote, store) = setup(ConfigEntityKind::Instrument);
        let created = store.create(aapl()).await.expect("create");

        let off = store.toggle_active("AAPL").await.expect("toggle off");
        assert!(!off.is_active);
        assert_eq!(off.attributes, created.attributes);

        let on = store.toggle_active("AAPL").await.expect("toggle on");
        assert!(on.is_active);
        assert_eq!(on.attributes, created.attributes);
    }

    #[tokio::test]
    async fn update_failure_restores_committed_value() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        store.create(aapl()).await.expect("create");
        remote
            .fail_next(
                ConfigEntityKind::Instrument,
                RemoteOp::Update,
                RemoteError::Status {
                    status: 500,
                    body: "boom".into(),
                },
            )
            .await;

        let patch = RecordPatch::new().set("maxPositionSize", Value::Number(5.0));
        let err = store.update("AAPL", patch).await.expect_err("server error");
        assert!(matches!(err, CommitError::Status { status: 500, .. }));

        let record = store.get("AAPL").await.expect("still present");
        assert_eq!(record.get("maxPositionSize"), Some(&Value::Number(1000.0)));
        assert!(matches!(store.sync_state("AAPL").await, SyncState::Failed(_)));

        // the next successful commit clears the failure
        let patch = RecordPatch::new().set("maxPositionSize", Value::Number(5.0));
        let record = store.update("AAPL", patch).await.expect("retry");
        assert_eq!(record.get("maxPositionSize"), Some(&Value::Number(5.0)));
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);
    }

    #[tokio::test]
    async fn update_times_out_and_rolls_back() {
        let remote = Arc::new(MemoryRemote::new());
        let store = ConfigStore::new(
            ConfigEntityKind::Instrument,
            remote.clone(),
            Duration::from_millis(50),
        );
        store.create(aapl()).await.expect("create");
        remote.set_latency(Duration::from_millis(200));

        let patch = RecordPatch::new().set("riskFactor", Value::Number(0.9));
        let err = store.update("AAPL", patch).await.expect_err("timeout");
        assert!(matches!(err, CommitError::Timeout { .. }));
        let record = store.get("AAPL").await.expect("record");
        assert_eq!(record.get("riskFactor"), Some(&Value::Number(0.5)));
    }

    #[tokio::test]
    async fn update_unknown_key_is_rejected() {
        let (remote, store) = setup(ConfigEntityKind::Broker);
        let err = store
            .update("ibkr", RecordPatch::new().active(false))
            .await
            .expect_err("unknown");
        assert!(matches!(err, CommitError::UnknownKey { .. }));
        assert_eq!(remote.commit_calls(), 0);
    }

    #[tokio::test]
    async fn update_cannot_rename_the_key() {
        let (_remote, store) = setup(ConfigEntityKind::Instrument);
        store.create(aapl()).await.expect("create");
        let patch = RecordPatch::new().set("symbol", Value::text("MSFT"));
        let err = store.update("AAPL", patch).await.expect_err("rename");
        match err {
            CommitError::Validation(errors) => {
                assert!(errors.has("symbol", FieldErrorCode::KeyMismatch))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.get("MSFT").await.is_none());
    }

    #[tokio::test]
    async fn strategy_parameters_are_checked_on_update() {
        let (_remote, store) = setup(ConfigEntityKind::Strategy);
        let mut params = BTreeMap::new();
        params.insert("lookback_period".to_string(), ParamValue::Number(20.0));
        params.insert("threshold".to_string(), ParamValue::Number(0.02));
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), Value::text("mom"));
        attrs.insert("type".into(), Value::text("momentum"));
        attrs.insert("parameters".into(), Value::ParameterMap(params));
        store.create(attrs).await.expect("create");

        let mut broken = BTreeMap::new();
        broken.insert("threshold".to_string(), ParamValue::Number(0.02));
        let patch = RecordPatch::new().set("parameters", Value::ParameterMap(broken));
        let err = store.update("mom", patch).await.expect_err("missing lookback");
        assert!(matches!(err, CommitError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_toggles_on_one_key_are_serialized() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        let store = Arc::new(store);
        store.create(aapl()).await.expect("create");
        remote.set_latency(Duration::from_millis(20));

        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.toggle_active("AAPL").await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.toggle_active("AAPL").await })
        };
        a.await.expect("join").expect("first toggle");
        b.await.expect("join").expect("second toggle");

        assert_eq!(remote.max_in_flight_per_key(), 1);
        let record = store.get("AAPL").await.expect("record");
        assert!(record.is_active, "two flips cancel out");
    }

    #[tokio::test]
    async fn load_failure_keeps_records() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        store.create(aapl()).await.expect("create");
        remote
            .fail_next(ConfigEntityKind::Instrument, RemoteOp::List, transport("down"))
            .await;

        let err = assert_err!(store.load().await);
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(store.records().await.len(), 1);
        assert!(matches!(store.last_error().await, Some(StoreError::Fetch(_))));

        let records = assert_ok!(store.load().await);
        assert_eq!(records.len(), 1);
        assert!(store.last_error().await.is_none());
    }

    #[tokio::test]
    async fn late_load_does_not_undo_an_acknowledged_toggle() {
        let memory = Arc::new(MemoryRemote::new());
        let remote = Arc::new(LaggingList {
            inner: memory.clone(),
            lag_next: AtomicBool::new(false),
            delay: Duration::from_millis(300),
        });
        let store = Arc::new(ConfigStore::new(
            ConfigEntityKind::Instrument,
            remote.clone(),
            TIMEOUT,
        ));
        store.create(aapl()).await.expect("create");

        remote.lag_next.store(true, Ordering::SeqCst);
        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.load().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_ok!(store.load().await);

        let toggled = store.toggle_active("AAPL").await.expect("toggle");
        assert!(!toggled.is_active);

        // the slow list saw isActive=true before the toggle and lands after it
        assert_ok!(slow.await.expect("join"));

        let server = memory
            .service()
            .get(ConfigEntityKind::Instrument, "AAPL")
            .await
            .expect("stored");
        assert_eq!(schema::active_flag_of(&server), Some(false));
        let local = store.get("AAPL").await.expect("local");
        assert!(!local.is_active);
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);

        // the next load agrees with the server
        assert_ok!(store.load().await);
        assert!(!store.get("AAPL").await.expect("local").is_active);
    }

    #[tokio::test]
    async fn failed_refresh_does_not_fail_the_commit() {
        let (remote, store) = setup(ConfigEntityKind::Instrument);
        remote
            .fail_next(ConfigEntityKind::Instrument, RemoteOp::List, transport("flaky"))
            .await;

        let record = store.create(aapl()).await.expect("commit acknowledged");
        assert_eq!(record.key, "AAPL");
        assert_eq!(store.sync_state("AAPL").await, SyncState::Committed);
        assert!(matches!(store.last_error().await, Some(StoreError::Fetch(_))));
        store.clear_error().await;
        assert!(store.last_error().await.is_none());
    }

    #[tokio::test]
    async fn load_skips_undecodable_and_keeps_extra_fields() {
        let (remote, store) = setup(ConfigEntityKind::Broker);
        remote
            .service()
            .upsert(
                ConfigEntityKind::Broker,
                &json!({ "name": "ibkr", "apiKey": "k", "apiSecret": "s", "maxOrderSize": 10 }),
            )
            .await
            .expect("seed");

        let records = store.load().await.expect("load");
        assert_eq!(records.len(), 1);
        assert!(records[0].extra.contains_key("updatedAt"));
        assert!(store.is_loaded().await);
    }

    #[tokio::test]
    async fn singleton_create_then_update() {
        let (_remote, store) = setup(ConfigEntityKind::SystemSettings);
        let created = store.create(Attributes::new()).await.expect("defaults only");
        assert_eq!(created.key, "system-settings");

        let patch = RecordPatch::new().set("maxConcurrentTrades", Value::Number(3.0));
        let updated = store.update("system-settings", patch).await.expect("update");
        assert_eq!(updated.get("maxConcurrentTrades"), Some(&Value::Number(3.0)));
        assert_eq!(store.records().await.len(), 1);
    }

    #[tokio::test]
    async fn stores_of_different_kinds_are_isolated() {
        let remote = Arc::new(MemoryRemote::new());
        let instruments = ConfigStore::new(ConfigEntityKind::Instrument, remote.clone(), TIMEOUT);
        let brokers = ConfigStore::new(ConfigEntityKind::Broker, remote.clone(), TIMEOUT);

        instruments.create(aapl()).await.expect("create");
        remote
            .fail_next(ConfigEntityKind::Broker, RemoteOp::List, transport("down"))
            .await;
        assert!(brokers.load().await.is_err());

        assert!(instruments.last_error().await.is_none());
        assert_eq!(instruments.records().await.len(), 1);
        assert!(brokers.records().await.is_empty());
    }
}
