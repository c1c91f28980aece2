//! Output formatting for console commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use serde_json::Value as Json;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::domain::{ConfigEntityKind, ConfigRecord};
use crate::schema::AttributeSchema;
use crate::store::SyncState;
use crate::telemetry::{PerformanceReport, RecentTrade, SystemStatus};

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let mut table = Table::new(items);
                table.with(Style::rounded());
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Print raw JSON value.
pub fn print_json_value(value: &Json) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a simple key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("{key:<24} {value}");
}

/// Records of one kind: key, flag, sync state, then one column per schema field
pub fn render_records(
    schema: &AttributeSchema,
    records: &[(ConfigRecord, SyncState)],
) -> String {
    let key_field = schema.kind.key_field();
    let columns: Vec<&str> = schema
        .fields
        .iter()
        .map(|f| f.name)
        .filter(|name| Some(*name) != key_field)
        .collect();

    let mut builder = Builder::default();
    let mut header = vec![
        key_field.unwrap_or("key").to_string(),
        "active".to_string(),
        "sync".to_string(),
    ];
    header.extend(columns.iter().map(|c| c.to_string()));
    builder.push_record(header);

    for (record, state) in records {
        let mut row = vec![
            record.key.clone(),
            yes_no(record.is_active).to_string(),
            state.label(),
        ];
        row.extend(columns.iter().map(|name| {
            record
                .get(name)
                .map(|v| truncate(&v.to_string(), 32))
                .unwrap_or_default()
        }));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Field-by-field view of one record
pub fn render_record(record: &ConfigRecord, state: &SyncState) -> String {
    let mut builder = Builder::default();
    builder.push_record(["field".to_string(), "value".to_string()]);
    builder.push_record(["key".to_string(), record.key.clone()]);
    builder.push_record(["isActive".to_string(), record.is_active.to_string()]);
    builder.push_record(["sync".to_string(), state.label()]);
    for (name, value) in &record.attributes {
        builder.push_record([name.clone(), value.to_string()]);
    }
    for (name, value) in &record.extra {
        let shown = match value {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        };
        builder.push_record([format!("{} (server)", name), shown]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[derive(Debug, Serialize, Tabled)]
pub struct KindRow {
    pub kind: String,
    pub path: String,
    pub key: String,
    pub fields: usize,
}

impl KindRow {
    pub fn new(kind: ConfigEntityKind, schema: &AttributeSchema) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            path: kind.path().to_string(),
            key: kind
                .key_field()
                .map(ToString::to_string)
                .unwrap_or_else(|| "(singleton)".to_string()),
            fields: schema.fields.len(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct FieldRow {
    pub field: String,
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    pub value_type: String,
    pub required: String,
    pub default: String,
    pub rules: String,
}

pub fn field_rows(schema: &AttributeSchema) -> Vec<FieldRow> {
    schema
        .fields
        .iter()
        .map(|f| FieldRow {
            field: f.name.to_string(),
            value_type: f.value_type.as_str().to_string(),
            required: yes_no(f.required).to_string(),
            default: f.default.as_ref().map(ToString::to_string).unwrap_or_default(),
            rules: f
                .rules
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

#[derive(Debug, Serialize, Tabled)]
pub struct VariantRow {
    pub discriminator: String,
    pub value: String,
    pub parameters: String,
}

pub fn variant_rows(schema: &AttributeSchema) -> Vec<VariantRow> {
    let Some(disc) = &schema.discriminator else {
        return Vec::new();
    };
    disc.variants
        .iter()
        .map(|v| VariantRow {
            discriminator: disc.field.to_string(),
            value: v.value.to_string(),
            parameters: v
                .params
                .iter()
                .map(|p| format!("{}.{} ({})", disc.params_field, p.name, p.value_type))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

#[derive(Debug, Serialize, Tabled)]
pub struct TradeRow {
    pub time: String,
    pub symbol: String,
    pub action: String,
    pub price: String,
    pub quantity: String,
}

impl From<&RecentTrade> for TradeRow {
    fn from(trade: &RecentTrade) -> Self {
        Self {
            time: trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            symbol: trade.symbol.clone(),
            action: trade.action.clone(),
            price: format!("{:.2}", trade.price),
            quantity: trade.quantity.map(|q| q.to_string()).unwrap_or_default(),
        }
    }
}

pub fn print_status(status: &SystemStatus) {
    print_kv("trading", if status.is_active { "active" } else { "halted" });
    print_kv("active instruments", &status.active_stocks_count.to_string());
    print_kv("cpu usage", &percent(status.cpu_usage));
    print_kv("memory usage", &percent(status.memory_usage));
}

pub fn print_performance(report: &PerformanceReport) {
    print_kv("equity points", &report.equity.len().to_string());
    print_kv(
        "latest equity",
        &report
            .equity
            .last()
            .map(|p| format!("{:.2} ({})", p.value, p.date))
            .unwrap_or_else(|| "-".to_string()),
    );
    print_kv(
        "total return",
        &report
            .total_return()
            .map(|r| format!("{:.2}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string()),
    );
    print_kv("max drawdown", &format!("{:.2}%", report.max_drawdown() * 100.0));
    print_kv("trades", &report.trades.len().to_string());
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
