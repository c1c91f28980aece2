//! `ats-console status|trades|performance`

use anyhow::Context;

use super::output::{self, OutputMode, TradeRow};
use crate::console::Console;

pub async fn status(console: &Console, mode: OutputMode) -> anyhow::Result<()> {
    let status = console
        .telemetry()
        .system_status()
        .await
        .context("fetching system status")?;
    match mode {
        OutputMode::Json => output::print_json_value(&serde_json::to_value(&status)?),
        OutputMode::Table => {
            output::print_status(&status);
            Ok(())
        }
    }
}

pub async fn trades(console: &Console, limit: usize, mode: OutputMode) -> anyhow::Result<()> {
    let mut trades = console
        .telemetry()
        .recent_trades()
        .await
        .context("fetching recent trades")?;
    trades.truncate(limit);
    let rows: Vec<TradeRow> = trades.iter().map(TradeRow::from).collect();
    output::print_items(&rows, mode)
}

pub async fn performance(console: &Console, mode: OutputMode) -> anyhow::Result<()> {
    let report = console
        .telemetry()
        .performance()
        .await
        .context("fetching performance series")?;
    match mode {
        OutputMode::Json => output::print_json_value(&serde_json::to_value(&report)?),
        OutputMode::Table => {
            output::print_performance(&report);
            Ok(())
        }
    }
}
