pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod console;
pub mod domain;
pub mod error;
pub mod remote;
pub mod schema;
pub mod services;
pub mod store;
pub mod telemetry;

pub use adapters::HttpRemote;
pub use config::AppConfig;
pub use console::{Console, RecordDraft};
pub use domain::{Attributes, ConfigEntityKind, ConfigRecord, RecordPatch, Value};
pub use error::{CommitError, ConsoleError, FetchError, Result, StoreError, ValidationErrors};
pub use remote::{ConfigRemote, MemoryRemote, TelemetrySource};
pub use schema::{decode_record, defaults, encode_record, schema_for, validate, AttributeSchema};
pub use services::ConfigService;
pub use store::{ConfigStore, SyncOp, SyncState};
