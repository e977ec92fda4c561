//! CLI command implementations
//!
//! Every command opens a `LocalStore`, initializes a mirror over the
//! configured collection, does its work through the mirror and tears it
//! down again. Output is one JSON object per line on stdout.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::mirror::{MirrorConfig, Mutation, MutationOutcome, RealtimeMirror};
use crate::observability::Logger;
use crate::record::{JsonRecord, RecordId};
use crate::remote::LocalStore;

use super::args::{Cli, Command, SortKey};
use super::errors::{CliError, CliResult};
use super::io::{parse_request, write_error, write_response};

/// How long `watch` keeps draining snapshots once stdin is closed
const WATCH_IDLE: Duration = Duration::from_millis(200);

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store file (optional, default "./rtmirror.json")
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Collection to mirror (optional, default "items")
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Mirror tuning
    #[serde(default)]
    pub mirror: MirrorConfig,
}

fn default_store_path() -> String {
    "./rtmirror.json".to_string()
}
fn default_collection() -> String {
    "items".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            collection: default_collection(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Build the effective configuration from an optional file plus
    /// command-line overrides
    pub fn resolve(
        path: Option<&Path>,
        store: Option<PathBuf>,
        collection: Option<String>,
    ) -> CliResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(store) = store {
            config.store_path = store.to_string_lossy().into_owned();
        }
        if let Some(collection) = collection {
            config.collection = collection;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.store_path.trim().is_empty() {
            return Err(CliError::config_error("store_path must not be empty"));
        }
        if self.collection.trim().is_empty() {
            return Err(CliError::config_error("collection must not be empty"));
        }
        self.mirror.validate()?;
        Ok(())
    }

    /// Path of the store file
    pub fn store_path(&self) -> &Path {
        Path::new(&self.store_path)
    }
}

/// One line of `watch` input
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WatchRequest {
    Add { fields: Value },
    Update { id: RecordId, fields: Value },
    Remove { id: RecordId },
    Clear,
}

impl From<WatchRequest> for Mutation {
    fn from(request: WatchRequest) -> Self {
        match request {
            WatchRequest::Add { fields } => Mutation::Insert(fields),
            WatchRequest::Update { id, fields } => Mutation::Update { id, fields },
            WatchRequest::Remove { id } => Mutation::Delete(id),
            WatchRequest::Clear => Mutation::DeleteAll,
        }
    }
}

/// Main entry point
pub fn run() -> CliResult<()> {
    Logger::init_from_env();
    let cli = Cli::parse_args();
    let config = Config::resolve(cli.config.as_deref(), cli.store, cli.collection)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_command(&config, cli.command))
}

/// Run the appropriate command based on CLI args
pub async fn run_command(config: &Config, cmd: Command) -> CliResult<()> {
    match cmd {
        Command::List { sort } => {
            let records = list(config, sort).await?;
            write_response(serde_json::to_value(records)?)
        }
        Command::Add { json } => {
            let outcome = submit(config, Mutation::Insert(parse_fields(&json)?)).await?;
            write_response(serde_json::to_value(outcome)?)
        }
        Command::Update { id, json } => {
            let mutation = Mutation::Update {
                id: parse_id(&id),
                fields: parse_fields(&json)?,
            };
            let outcome = submit(config, mutation).await?;
            write_response(serde_json::to_value(outcome)?)
        }
        Command::Remove { id } => {
            let outcome = submit(config, Mutation::Delete(parse_id(&id))).await?;
            write_response(serde_json::to_value(outcome)?)
        }
        Command::Clear => {
            let outcome = submit(config, Mutation::DeleteAll).await?;
            write_response(serde_json::to_value(outcome)?)
        }
        Command::Watch { events } => watch(config, events).await,
    }
}

struct Session {
    mirror: RealtimeMirror<JsonRecord>,
    snapshots: mpsc::UnboundedReceiver<Vec<JsonRecord>>,
}

async fn open(config: &Config) -> CliResult<Session> {
    let store = Arc::new(LocalStore::open(config.store_path()));
    let mirror = RealtimeMirror::with_config(store, config.collection.clone(), config.mirror.clone())?;

    let (tx, snapshots) = mpsc::unbounded_channel();
    mirror
        .initialize(move |records: &[JsonRecord]| {
            let _ = tx.send(records.to_vec());
        })
        .await?;

    Ok(Session { mirror, snapshots })
}

/// Current records of the configured collection
pub async fn list(config: &Config, sort: SortKey) -> CliResult<Vec<JsonRecord>> {
    let session = open(config).await?;
    let records = session.mirror.snapshot_sorted_by(|a, b| compare(sort, a, b));
    session.mirror.teardown();
    Ok(records)
}

/// Submit one mutation through a freshly initialized mirror
pub async fn submit(config: &Config, mutation: Mutation) -> CliResult<MutationOutcome> {
    let session = open(config).await?;
    let outcome = session.mirror.mutate(mutation).await;
    session.mirror.teardown();
    Ok(outcome?)
}

/// Print a snapshot on every change while applying requests from stdin.
///
/// Stops after `events` snapshots, on Ctrl-C, or once stdin is closed and
/// no snapshot arrived for a short while.
pub async fn watch(config: &Config, events: Option<usize>) -> CliResult<()> {
    let mut session = open(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut emitted = 0usize;

    loop {
        if events.is_some_and(|limit| emitted >= limit) {
            break;
        }

        tokio::select! {
            snapshot = session.snapshots.recv() => match snapshot {
                Some(records) => {
                    write_response(json!({ "count": records.len(), "records": records }))?;
                    emitted += 1;
                }
                None => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if let Err(e) = apply_request(&session.mirror, &line).await {
                        write_error(e.code_str(), e.message())?;
                    }
                }
                None => stdin_open = false,
            },
            _ = tokio::time::sleep(WATCH_IDLE), if !stdin_open => break,
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.mirror.teardown();
    Ok(())
}

async fn apply_request(mirror: &RealtimeMirror<JsonRecord>, line: &str) -> CliResult<()> {
    let request: WatchRequest = serde_json::from_value(parse_request(line)?)?;
    let outcome = mirror.mutate(request.into()).await?;
    write_response(json!({ "outcome": outcome }))
}

/// Read a command-line id. A JSON string or integer literal is taken as-is,
/// so `'"007"'` targets the text id `007`; anything else goes through
/// [`RecordId::parse`].
fn parse_id(input: &str) -> RecordId {
    serde_json::from_str::<Value>(input)
        .ok()
        .and_then(|value| RecordId::from_value(&value))
        .unwrap_or_else(|| RecordId::parse(input))
}

fn parse_fields(json: &str) -> CliResult<Value> {
    serde_json::from_str(json).map_err(|e| CliError::invalid_input(format!("Invalid record JSON: {}", e)))
}

fn compare(sort: SortKey, a: &JsonRecord, b: &JsonRecord) -> Ordering {
    match sort {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Created => match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliErrorCode;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> Config {
        Config {
            store_path: temp_dir.path().join("store.json").to_string_lossy().into_owned(),
            collection: "todos".to_string(),
            mirror: MirrorConfig::default(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rtmirror.json");
        fs::write(&path, r#"{"store_path": "/tmp/data.json"}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.collection, "items");
        assert_eq!(config.mirror, MirrorConfig::default());
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rtmirror.json");
        fs::write(&path, r#"{"mirror": {"fetch_timeout_ms": 0}}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let config = Config::resolve(None, Some(PathBuf::from("/tmp/x.json")), Some("notes".into())).unwrap();
        assert_eq!(config.store_path(), Path::new("/tmp/x.json"));
        assert_eq!(config.collection, "notes");

        assert!(Config::resolve(None, None, Some(" ".into())).is_err());
    }

    #[test]
    fn test_watch_request_parsing() {
        let request: WatchRequest = serde_json::from_str(r#"{"op":"update","id":3,"fields":{"done":true}}"#).unwrap();
        assert_eq!(
            Mutation::from(request),
            Mutation::Update {
                id: RecordId::Number(3),
                fields: json!({"done": true}),
            }
        );
        let request: WatchRequest = serde_json::from_str(r#"{"op":"clear"}"#).unwrap();
        assert_eq!(Mutation::from(request), Mutation::DeleteAll);
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_config(&temp_dir);

        let first = submit(&config, Mutation::Insert(json!({"title": "a"}))).await.unwrap();
        let second = submit(&config, Mutation::Insert(json!({"title": "b"}))).await.unwrap();
        assert_eq!(first, MutationOutcome::Inserted(RecordId::Number(1)));
        assert_eq!(second, MutationOutcome::Inserted(RecordId::Number(2)));

        let records = list(&config, SortKey::Id).await.unwrap();
        let titles: Vec<_> = records.iter().filter_map(|r| r.field("title")).cloned().collect();
        assert_eq!(titles, vec![json!("a"), json!("b")]);
        assert!(records.iter().all(|r| r.created_at.is_some()));
    }

    #[tokio::test]
    async fn test_remove_missing_record_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_config(&temp_dir);

        let err = submit(&config, Mutation::Delete(RecordId::Number(9))).await.unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::MirrorFailed);
    }

    #[tokio::test]
    async fn test_clear_reports_count() {
        let temp_dir = TempDir::new().unwrap();
        let config = create_config(&temp_dir);
        for title in ["a", "b", "c"] {
            submit(&config, Mutation::Insert(json!({ "title": title }))).await.unwrap();
        }

        let outcome = submit(&config, Mutation::DeleteAll).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Cleared(3));
        assert!(list(&config, SortKey::Id).await.unwrap().is_empty());
    }

    #[test]
    fn test_compare_created_puts_undated_last() {
        let dated = JsonRecord {
            id: RecordId::Number(2),
            created_at: Some(chrono::Utc::now()),
            fields: Default::default(),
        };
        let undated = JsonRecord {
            id: RecordId::Number(1),
            created_at: None,
            fields: Default::default(),
        };
        assert_eq!(compare(SortKey::Created, &dated, &undated), Ordering::Less);
        assert_eq!(compare(SortKey::Id, &dated, &undated), Ordering::Greater);
    }

    #[test]
    fn test_parse_id_accepts_json_literals() {
        assert_eq!(parse_id("7"), RecordId::Number(7));
        assert_eq!(parse_id("007"), RecordId::Number(7));
        assert_eq!(parse_id(r#""007""#), RecordId::Text("007".into()));
        assert_eq!(parse_id(r#""42""#), RecordId::Text("42".into()));
        assert_eq!(parse_id("abc-1"), RecordId::Text("abc-1".into()));
        assert_eq!(parse_id("1.5"), RecordId::Text("1.5".into()));
    }
}
