//! ats-console CLI - trading system configuration management
//!
//! Commands:
//! - `ats-console list|show|create|update|toggle <kind>` - Manage configuration records
//! - `ats-console schema <kind>` - Show the fields a kind accepts
//! - `ats-console status|trades|performance` - Read-only telemetry
//! - `ats-console serve` - Run the reference configuration API

pub mod monitor;
pub mod output;
pub mod records;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::console::Console;
use crate::domain::ConfigEntityKind;
use crate::remote::MemoryRemote;
use crate::services::{ConfigService, ServiceSeed};
use output::OutputMode;

/// Trading system configuration console
#[derive(Parser, Debug)]
#[command(name = "ats-console")]
#[command(author, version, about = "Operator console for trading system configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration API base URL (overrides config files)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Directory holding default.toml and environment overrides
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: String,

    /// Work against an in-process service instead of the REST API
    #[arg(long, global = true)]
    pub offline: bool,

    /// JSON seed file for --offline sessions
    #[arg(long, global = true)]
    pub seed: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configuration entity kinds
    Kinds,

    /// Show the attribute schema of a kind
    Schema { kind: ConfigEntityKind },

    /// List every record of a kind
    List { kind: ConfigEntityKind },

    /// Show one record (singleton kinds need no key)
    Show {
        kind: ConfigEntityKind,
        key: Option<String>,
    },

    /// Create a record
    Create {
        kind: ConfigEntityKind,
        /// Field assignment, repeatable (e.g. --set symbol=AAPL --set parameters.threshold=0.02)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Attributes as a JSON object, applied before --set
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
        /// Create the record inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Change fields of an existing record
    Update {
        kind: ConfigEntityKind,
        key: Option<String>,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
        /// Mark the record active
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,
        /// Mark the record inactive
        #[arg(long)]
        deactivate: bool,
    },

    /// Flip a record's isActive flag
    Toggle {
        kind: ConfigEntityKind,
        key: Option<String>,
    },

    /// Show system status
    Status,

    /// Show recent trades
    Trades {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show equity, returns and drawdown summary
    Performance,

    /// Run the reference configuration API
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

impl Cli {
    /// Load configuration and apply command-line overrides
    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load_from(&self.config_dir)
            .with_context(|| format!("loading configuration from {}", self.config_dir))?;
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.api.auth_token = Some(token.clone());
        }
        if let Some(ms) = self.timeout_ms {
            config.api.request_timeout_ms = ms;
        }
        if let Some(seed) = &self.seed {
            config.server.seed = Some(seed.clone());
        }
        Ok(config)
    }

    pub async fn run(self, config: AppConfig) -> anyhow::Result<()> {
        let mode = OutputMode::from_json_flag(self.json);

        match self.command {
            Commands::Kinds => return records::kinds(mode),
            Commands::Schema { kind } => return records::schema(kind, mode),
            Commands::Serve { bind } => {
                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                return serve(&config, &bind).await;
            }
            _ => {}
        }

        let console = if self.offline {
            let service = seeded_service(config.server.seed.as_deref()).await?;
            Console::offline(
                Arc::new(MemoryRemote::with_service(service)),
                config.api.request_timeout(),
            )
        } else {
            Console::connect(&config.api)?
        };

        match self.command {
            Commands::List { kind } => records::list(&console, kind, mode).await,
            Commands::Show { kind, key } => records::show(&console, kind, key, mode).await,
            Commands::Create {
                kind,
                set,
                data,
                inactive,
            } => records::create(&console, kind, &set, data.as_deref(), inactive, mode).await,
            Commands::Update {
                kind,
                key,
                set,
                data,
                activate,
                deactivate,
            } => {
                let active = match (activate, deactivate) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                records::update(&console, kind, key, &set, data.as_deref(), active, mode).await
            }
            Commands::Toggle { kind, key } => records::toggle(&console, kind, key, mode).await,
            Commands::Status => monitor::status(&console, mode).await,
            Commands::Trades { limit } => monitor::trades(&console, limit, mode).await,
            Commands::Performance => monitor::performance(&console, mode).await,
            Commands::Kinds | Commands::Schema { .. } | Commands::Serve { .. } => Ok(()),
        }
    }
}

/// Service preloaded from an optional seed file
pub async fn seeded_service(seed: Option<&str>) -> anyhow::Result<Arc<ConfigService>> {
    let service = Arc::new(ConfigService::new());
    if let Some(path) = seed {
        let seed = ServiceSeed::from_file(Path::new(path))
            .with_context(|| format!("reading seed file {}", path))?;
        let stored = service.apply_seed(seed).await?;
        info!(path, records = stored, "seed applied");
    }
    Ok(service)
}

async fn serve(config: &AppConfig, bind: &str) -> anyhow::Result<()> {
    let service = seeded_service(config.server.seed.as_deref()).await?;
    let state = AppState::new(service).with_auth_token(config.api.auth_token.as_deref());
    api::serve(bind, state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_assignments() {
        let cli = Cli::try_parse_from([
            "ats-console",
            "--offline",
            "create",
            "instrument",
            "--set",
            "symbol=AAPL",
            "--set",
            "maxPositionSize=100",
            "--inactive",
        ])
        .expect("valid command line");
        assert!(cli.offline);
        match cli.command {
            Commands::Create {
                kind,
                set,
                inactive,
                data,
            } => {
                assert_eq!(kind, ConfigEntityKind::Instrument);
                assert_eq!(set.len(), 2);
                assert!(inactive);
                assert!(data.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kinds_and_conflicting_flags() {
        assert!(Cli::try_parse_from(["ats-console", "list", "portfolio"]).is_err());
        assert!(Cli::try_parse_from([
            "ats-console",
            "update",
            "broker",
            "ibkr",
            "--activate",
            "--deactivate"
        ])
        .is_err());
    }

    #[test]
    fn command_line_overrides_config() {
        let cli = Cli::try_parse_from([
            "ats-console",
            "--api-url",
            "http://10.1.1.1:8000/api",
            "--timeout-ms",
            "1500",
            "--config-dir",
            "/nonexistent/ats-console",
            "status",
        ])
        .expect("valid command line");
        let config = cli.load_config().expect("defaults plus overrides");
        assert_eq!(config.api.base_url, "http://10.1.1.1:8000/api");
        assert_eq!(config.api.request_timeout_ms, 1500);
    }
}
