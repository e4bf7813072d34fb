//! Crash artifact downloads and their on-disk layout.
//!
//! ```text
//! OUTPUTDIR/
//!   raw_crash/20YYMMDD/<crash id>    annotations, JSON
//!   dump_names/<crash id>            JSON list of dump names
//!   <dump name>/<crash id>           binary dump
//!   processed_crash/<crash id>       processed crash, JSON
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::stream::{self, Stream, StreamExt};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info};

use crate::client::{Transport, PROCESSED_CRASH_ENDPOINT, RAW_CRASH_ENDPOINT};
use crate::crash_id::{crash_id_date, require_crash_id};
use crate::error::{Error, Result};

/// Upper bound on concurrent downloads.
pub const MAX_WORKERS: usize = 10;

/// Dump name as stored in the raw crash versus as requested from the API.
const MINIDUMP_NAME: &str = "upload_file_minidump";
const MINIDUMP_API_NAME: &str = "dump";

fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Crash annotations (the raw crash). Without a token only public
/// annotations come back.
pub async fn get_crash_annotations(transport: &dyn Transport, crash_id: &str) -> Result<Value> {
    transport
        .get_json(RAW_CRASH_ENDPOINT, &query(&[("crash_id", crash_id), ("format", "meta")]))
        .await
}

pub async fn get_processed_crash(transport: &dyn Transport, crash_id: &str) -> Result<Value> {
    transport
        .get_json(
            PROCESSED_CRASH_ENDPOINT,
            &query(&[("crash_id", crash_id), ("format", "meta")]),
        )
        .await
}

/// Binary dump `dump_name` for a crash. Requires a token with dump access.
pub async fn get_dump(transport: &dyn Transport, crash_id: &str, dump_name: &str) -> Result<Vec<u8>> {
    transport
        .get_bytes(
            RAW_CRASH_ENDPOINT,
            &query(&[
                ("crash_id", crash_id),
                ("format", "raw"),
                ("name", api_dump_name(dump_name)),
            ]),
        )
        .await
}

fn api_dump_name(dump_name: &str) -> &str {
    if dump_name == MINIDUMP_NAME {
        MINIDUMP_API_NAME
    } else {
        dump_name
    }
}

/// Dump names listed in a raw crash's `metadata.dump_checksums`.
pub fn dump_names(raw_crash: &Value) -> Vec<String> {
    raw_crash
        .get("metadata")
        .and_then(|m| m.get("dump_checksums"))
        .and_then(Value::as_object)
        .map(|checksums| checksums.keys().cloned().collect())
        .unwrap_or_default()
}

/// Paths under an output directory.
#[derive(Debug, Clone)]
pub struct CrashLayout {
    root: PathBuf,
}

impl CrashLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_crash_path(&self, crash_id: &str) -> PathBuf {
        let date = crash_id_date(crash_id).unwrap_or_default();
        self.root.join("raw_crash").join(date).join(crash_id)
    }

    pub fn dump_names_path(&self, crash_id: &str) -> PathBuf {
        self.root.join("dump_names").join(crash_id)
    }

    pub fn dump_path(&self, dump_name: &str, crash_id: &str) -> PathBuf {
        self.root.join(dump_name).join(crash_id)
    }

    pub fn processed_crash_path(&self, crash_id: &str) -> PathBuf {
        self.root.join("processed_crash").join(crash_id)
    }

    /// Fail when the root exists but is not a directory.
    pub fn check_root(&self) -> Result<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// What to download for each crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub raw: bool,
    pub dumps: bool,
    pub processed: bool,
    pub overwrite: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            raw: true,
            dumps: false,
            processed: false,
            overwrite: true,
        }
    }
}

impl FetchOptions {
    pub fn validate(&self, has_token: bool) -> Result<()> {
        if self.dumps && !self.raw {
            return Err(Error::invalid_argument(
                "You cannot fetch dumps without also fetching the raw crash.",
            ));
        }
        if self.dumps && !has_token {
            return Err(Error::invalid_argument(
                "You cannot fetch dumps without providing an API token.",
            ));
        }
        Ok(())
    }
}

/// Worker count clamped to `1..=MAX_WORKERS`; more than one needs a token.
pub fn check_workers(workers: usize, has_token: bool) -> Result<usize> {
    let workers = workers.clamp(1, MAX_WORKERS);
    if workers > 1 && !has_token {
        return Err(Error::invalid_argument(
            "You must specify a CRASHSTATS_API_TOKEN in order to set workers > 1.",
        ));
    }
    Ok(workers)
}

/// Files written and skipped for one crash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub crash_id: String,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Download the requested artifacts for one crash id (any accepted form).
pub async fn fetch_crash(
    transport: &dyn Transport,
    layout: &CrashLayout,
    crash_id: &str,
    options: FetchOptions,
) -> Result<FetchReport> {
    let crash_id = require_crash_id(crash_id)?;
    let mut report = FetchReport {
        crash_id: crash_id.clone(),
        ..FetchReport::default()
    };

    if options.raw {
        let path = layout.raw_crash_path(&crash_id);
        let raw_crash = if should_skip(&path, options.overwrite).await? {
            info!("{}: fetching raw crash -- already exists", crash_id);
            report.skipped.push(path.clone());
            if options.dumps {
                Some(read_json(&path).await?)
            } else {
                None
            }
        } else {
            info!("{}: fetching raw crash", crash_id);
            let raw_crash = get_crash_annotations(transport, &crash_id).await?;
            write_json(&path, &raw_crash).await?;
            report.written.push(path);
            Some(raw_crash)
        };

        if let (true, Some(raw_crash)) = (options.dumps, raw_crash) {
            fetch_dumps(transport, layout, &crash_id, &raw_crash, options, &mut report).await?;
        }
    }

    if options.processed {
        let path = layout.processed_crash_path(&crash_id);
        if should_skip(&path, options.overwrite).await? {
            info!("{}: fetching processed crash -- already exists", crash_id);
            report.skipped.push(path);
        } else {
            info!("{}: fetching processed crash", crash_id);
            let processed = get_processed_crash(transport, &crash_id).await?;
            write_json(&path, &processed).await?;
            report.written.push(path);
        }
    }

    Ok(report)
}

async fn fetch_dumps(
    transport: &dyn Transport,
    layout: &CrashLayout,
    crash_id: &str,
    raw_crash: &Value,
    options: FetchOptions,
    report: &mut FetchReport,
) -> Result<()> {
    let names = dump_names(raw_crash);
    let names_path = layout.dump_names_path(crash_id);
    write_bytes(&names_path, serde_json::to_string(&names)?.as_bytes()).await?;
    report.written.push(names_path);

    for name in &names {
        let path = layout.dump_path(name, crash_id);
        if should_skip(&path, options.overwrite).await? {
            info!("{}: fetching dump: {} -- already exists", crash_id, name);
            report.skipped.push(path);
            continue;
        }
        info!("{}: fetching dump: {}", crash_id, name);
        let content = get_dump(transport, crash_id, name).await?;
        write_bytes(&path, &content).await?;
        report.written.push(path);
    }
    Ok(())
}

/// Fetch many crashes with up to `workers` in flight; results arrive in
/// completion order.
pub fn fetch_crashes<'a>(
    transport: &'a dyn Transport,
    layout: &'a CrashLayout,
    crash_ids: Vec<String>,
    options: FetchOptions,
    workers: usize,
) -> impl Stream<Item = (String, Result<FetchReport>)> + Send + 'a {
    let workers = workers.clamp(1, MAX_WORKERS);
    stream::iter(crash_ids)
        .map(move |crash_id| async move {
            let result = fetch_crash(transport, layout, &crash_id, options).await;
            (crash_id, result)
        })
        .buffer_unordered(workers)
}

async fn should_skip(path: &Path, overwrite: bool) -> Result<bool> {
    Ok(!overwrite && fs::try_exists(path).await?)
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

async fn write_json(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(&sort_keys(value))?;
    write_bytes(path, content.as_bytes()).await
}

async fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    debug!(path = %path.display(), bytes = content.len(), "writing");
    fs::write(path, content).await?;
    Ok(())
}

/// Copy of `value` with every object's keys in sorted order.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}
