//! `ats-console list|show|create|update|toggle|schema|kinds`

use anyhow::{anyhow, bail, Context};
use serde_json::Value as Json;

use super::output::{self, FieldRow, KindRow, OutputMode};
use crate::console::{Console, RecordDraft};
use crate::domain::{ConfigEntityKind, ConfigRecord};
use crate::error::CommitError;
use crate::schema::schema_for;
use crate::store::ConfigStore;

/// Resolve the record key: singleton kinds have a fixed one
pub fn resolve_key(kind: ConfigEntityKind, key: Option<String>) -> anyhow::Result<String> {
    match (kind.singleton_key(), key) {
        (Some(fixed), None) => Ok(fixed.to_string()),
        (Some(fixed), Some(given)) if given == fixed => Ok(given),
        (Some(fixed), Some(given)) => bail!(
            "{} is a singleton (key '{}'), got '{}'",
            kind,
            fixed,
            given
        ),
        (None, Some(given)) if !given.trim().is_empty() => Ok(given.trim().to_string()),
        (None, _) => bail!(
            "{} records are addressed by {}",
            kind,
            kind.key_field().unwrap_or("key")
        ),
    }
}

async fn loaded_store(console: &Console, kind: ConfigEntityKind) -> anyhow::Result<&ConfigStore> {
    let store = console.store(kind);
    store
        .load()
        .await
        .with_context(|| format!("loading {} from {}", kind.label(), console.source()))?;
    Ok(store.as_ref())
}

pub fn kinds(mode: OutputMode) -> anyhow::Result<()> {
    let rows: Vec<KindRow> = ConfigEntityKind::ALL
        .iter()
        .map(|k| KindRow::new(*k, schema_for(*k)))
        .collect();
    output::print_items(&rows, mode)
}

pub fn schema(kind: ConfigEntityKind, mode: OutputMode) -> anyhow::Result<()> {
    let schema = schema_for(kind);
    let fields: Vec<FieldRow> = output::field_rows(schema);
    output::print_items(&fields, mode)?;
    let variants = output::variant_rows(schema);
    if !variants.is_empty() {
        if mode == OutputMode::Table {
            println!();
        }
        output::print_items(&variants, mode)?;
    }
    Ok(())
}

pub async fn list(console: &Console, kind: ConfigEntityKind, mode: OutputMode) -> anyhow::Result<()> {
    let store = loaded_store(console, kind).await?;
    let records = store.records().await;
    match mode {
        OutputMode::Json => output::print_json_value(&Json::Array(
            records.iter().map(ConfigRecord::to_json).collect(),
        )),
        OutputMode::Table => {
            if records.is_empty() {
                println!("(no {} configured)", kind.label());
                return Ok(());
            }
            let mut rows = Vec::with_capacity(records.len());
            for record in records {
                let state = store.sync_state(&record.key).await;
                rows.push((record, state));
            }
            println!("{}", output::render_records(schema_for(kind), &rows));
            Ok(())
        }
    }
}

pub async fn show(
    console: &Console,
    kind: ConfigEntityKind,
    key: Option<String>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let key = resolve_key(kind, key)?;
    let store = loaded_store(console, kind).await?;
    let record = store
        .get(&key)
        .await
        .ok_or_else(|| anyhow!("{} '{}' not found", kind, key))?;
    print_record(store, &record, mode).await
}

pub async fn create(
    console: &Console,
    kind: ConfigEntityKind,
    assignments: &[String],
    data: Option<&str>,
    inactive: bool,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let mut draft = RecordDraft::new(kind);
    if let Some(raw) = data {
        draft.merge_json(raw)?;
    }
    for assignment in assignments {
        draft.assign(assignment)?;
    }
    if inactive {
        draft.set_active(false);
    }

    let store = loaded_store(console, kind).await?;
    let (attributes, is_active) = draft.into_parts();
    let record = store
        .create_with_state(attributes, is_active)
        .await
        .map_err(report_commit_error)?;
    if mode == OutputMode::Table {
        println!("✓ created {} '{}'", kind, record.key);
    }
    print_record(store, &record, mode).await
}

pub async fn update(
    console: &Console,
    kind: ConfigEntityKind,
    key: Option<String>,
    assignments: &[String],
    data: Option<&str>,
    active: Option<bool>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let key = resolve_key(kind, key)?;
    let store = loaded_store(console, kind).await?;
    let current = store
        .get(&key)
        .await
        .ok_or_else(|| anyhow!("{} '{}' not found", kind, key))?;

    let mut draft = RecordDraft::from_record(&current);
    if let Some(raw) = data {
        draft.merge_json(raw)?;
    }
    for assignment in assignments {
        draft.assign(assignment)?;
    }
    if let Some(flag) = active {
        draft.set_active(flag);
    }

    let patch = draft.changes_from(&current);
    if patch.is_empty() {
        if mode == OutputMode::Table {
            println!("nothing to change for {} '{}'", kind, key);
        }
        return print_record(store, &current, mode).await;
    }

    let record = store
        .update(&key, patch)
        .await
        .map_err(report_commit_error)?;
    if mode == OutputMode::Table {
        println!("✓ updated {} '{}'", kind, record.key);
    }
    print_record(store, &record, mode).await
}

pub async fn toggle(
    console: &Console,
    kind: ConfigEntityKind,
    key: Option<String>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let key = resolve_key(kind, key)?;
    let store = loaded_store(console, kind).await?;
    let record = store
        .toggle_active(&key)
        .await
        .map_err(report_commit_error)?;
    if mode == OutputMode::Table {
        let now = if record.is_active { "active" } else { "inactive" };
        println!("✓ {} '{}' is now {}", kind, record.key, now);
    }
    print_record(store, &record, mode).await
}

async fn print_record(store: &ConfigStore, record: &ConfigRecord, mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => output::print_json_value(&record.to_json()),
        OutputMode::Table => {
            let state = store.sync_state(&record.key).await;
            println!("{}", output::render_record(record, &state));
            Ok(())
        }
    }
}

/// List every field error on stderr before handing the failure up
fn report_commit_error(err: CommitError) -> anyhow::Error {
    if let CommitError::Validation(errors) = &err {
        for field_error in &errors.errors {
            eprintln!(
                "  ✗ {} [{}]: {}",
                field_error.field,
                field_error.code.as_str(),
                field_error.message
            );
        }
    }
    anyhow::Error::new(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_keys_resolve_without_input() {
        assert_eq!(
            resolve_key(ConfigEntityKind::RiskPolicy, None).expect("fixed key"),
            "risk-management"
        );
        assert!(resolve_key(ConfigEntityKind::RiskPolicy, Some("other".into())).is_err());
        assert_eq!(
            resolve_key(ConfigEntityKind::Broker, Some(" ibkr ".into())).expect("given"),
            "ibkr"
        );
        assert!(resolve_key(ConfigEntityKind::Instrument, None).is_err());
    }
}
