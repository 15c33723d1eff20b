//! Structured JSON-lines logging for simulation runs.
//!
//! Every record carries `ts`, `run_id`, `seq`, `lvl`, `component`, `event` and a
//! `data` object. Records go to stderr so stdout stays free for results; when
//! `LOG_DIR` is set they are also appended to `<LOG_DIR>/<run_id>/events.jsonl`.
//!
//! Filtering: `LOG_LEVEL` (trace..fatal, default info) and `LOG_DOMAINS`
//! (comma-separated list or "all"). Both are read once per process.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::engine::{Strategy, Tally};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "fatal" => Some(Level::Fatal),
            _ => None,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| Level::parse(&v))
            .unwrap_or(Level::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Sim,     // Trial batches, tallies
    Chart,   // Convergence series, trend fits, exports
    System,  // Startup, config, shutdown
    Profile, // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Sim => "sim",
            Domain::Chart => "chart",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        filter().domains.as_ref().map_or(true, |list| {
            list.iter().any(|d| d == self.as_str())
        })
    }
}

// =============================================================================
// Process-wide context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);
static FILTER: OnceLock<Filter> = OnceLock::new();
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

struct Filter {
    min_level: Level,
    // None = all domains
    domains: Option<Vec<String>>,
}

fn filter() -> &'static Filter {
    FILTER.get_or_init(|| Filter {
        min_level: Level::from_env(),
        domains: match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => None,
            Ok(list) => Some(list.split(',').map(|d| d.trim().to_string()).collect()),
        },
    })
}

struct RunContext {
    run_id: String,
    events: Option<EventSink>,
}

/// Append-only `events.jsonl` under `<base>/<run_id>/`.
pub struct EventSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl EventSink {
    pub fn open(base: &Path, run_id: &str) -> std::io::Result<Self> {
        let run_dir = base.join(run_id);
        create_dir_all(&run_dir)?;
        let path = run_dir.join("events.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Errors and above are flushed at once so a failing run keeps its trail.
    pub fn write_line(&self, level: Level, line: &str) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = writeln!(w, "{}", line);
            if level >= Level::Error {
                let _ = w.flush();
            }
        }
    }

    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            EventSink::open(Path::new(&base), &run_id)
                .map_err(|err| eprintln!("[log] failed to open events log: {}", err))
                .ok()
        });
        RunContext { run_id, events }
    })
}

/// Identifier shared by every record of this process.
pub fn run_id() -> &'static str {
    &ensure_run_context().run_id
}

/// Flush the events file, if any. Binaries call this on every exit path.
pub fn flush() {
    if let Some(events) = &ensure_run_context().events {
        events.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

pub fn enabled(level: Level, domain: Domain) -> bool {
    level >= filter().min_level && domain.is_enabled()
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if !enabled(level, domain) {
        return;
    }
    let line = format_record(level, domain.as_str(), event, fields);
    if let Some(events) = &ensure_run_context().events {
        events.write_line(level, &line);
    }
    eprintln!("{}", line);
}

fn format_record(level: Level, component: &str, event: &str, mut fields: Map<String, Value>) -> String {
    let ctx = ensure_run_context();
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));
    Value::Object(entry).to_string()
}

// =============================================================================
// Simulation logs
// =============================================================================

pub fn log_startup(binary: &str, fingerprint: &str, seed: u64, config: Value) {
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("binary", v_str(binary)),
            ("version", v_str(env!("CARGO_PKG_VERSION"))),
            ("config_hash", v_str(fingerprint)),
            ("seed", json!(seed)),
            ("config", config),
        ]),
    );
}

/// A run that ended in an error, including rejected configuration.
pub fn log_failure(binary: &str, error: &str) {
    log(Level::Error, Domain::System, "run_failed", failure_fields(binary, error));
}

fn failure_fields(binary: &str, error: &str) -> Map<String, Value> {
    obj(&[("binary", v_str(binary)), ("error", v_str(error))])
}

/// Per-batch counters from a worker.
pub fn log_batch(batch: usize, strategy: Strategy, doors: u32, tally: &Tally) {
    log(
        Level::Debug,
        Domain::Sim,
        "batch_done",
        obj(&[
            ("batch", json!(batch)),
            ("strategy", v_str(strategy.as_str())),
            ("doors", json!(doors)),
            ("wins", json!(tally.wins)),
            ("losses", json!(tally.losses)),
        ]),
    );
}

pub fn log_tally(strategy: Strategy, doors: u32, tally: &Tally, expected: f64) {
    log(
        Level::Info,
        Domain::Sim,
        "tally",
        obj(&[
            ("strategy", v_str(strategy.as_str())),
            ("doors", json!(doors)),
            ("wins", json!(tally.wins)),
            ("losses", json!(tally.losses)),
            ("win_rate", v_num(tally.win_rate())),
            ("expected", v_num(expected)),
        ]),
    );
}

pub fn log_fit(strategy: Strategy, slope: f64, intercept: f64, points: usize) {
    log(
        Level::Info,
        Domain::Chart,
        "trend_fit",
        obj(&[
            ("strategy", v_str(strategy.as_str())),
            ("slope", v_num(slope)),
            ("intercept", v_num(intercept)),
            ("points", json!(points)),
        ]),
    );
}

// =============================================================================
// Field helpers
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
    enabled: bool,
}

impl ProfileScope {
    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        let enabled = enabled(Level::Trace, Domain::Profile) && Self::should_sample();
        Self {
            label,
            context: if enabled { Some(obj(fields)) } else { None },
            started: Instant::now(),
            enabled,
        }
    }

    fn should_sample() -> bool {
        std::env::var("PROFILE_SAMPLE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .map(|p| {
                if p >= 1.0 {
                    true
                } else if p <= 0.0 {
                    false
                } else {
                    let seq = PROFILE_SEQ.fetch_add(1, Ordering::SeqCst);
                    let bucket = (seq % 10_000) as f64 / 10_000.0;
                    bucket < p
                }
            })
            .unwrap_or(true)
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse(" warn"), Some(Level::Warn));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", v_num(42.0))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42.0);
    }

    #[test]
    fn test_record_shape() {
        let line = format_record(
            Level::Warn,
            "sim",
            "tally",
            obj(&[("msg", v_str("hello")), ("wins", json!(3))]),
        );
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["lvl"], "WARN");
        assert_eq!(v["component"], "sim");
        assert_eq!(v["event"], "tally");
        assert_eq!(v["msg"], "hello");
        assert_eq!(v["data"]["wins"], 3);
        assert!(v["data"].get("msg").is_none());
        assert_eq!(v["run_id"], run_id());
    }

    #[test]
    fn test_event_sink_writes_after_flush() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::open(dir.path(), "r-sink").unwrap();
        assert_eq!(sink.path(), dir.path().join("r-sink").join("events.jsonl"));

        let line = format_record(Level::Info, "system", "startup", obj(&[("seed", json!(7))]));
        sink.write_line(Level::Info, &line);
        sink.flush();

        let raw = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 1);
        let v: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(v["event"], "startup");
        assert_eq!(v["data"]["seed"], 7);
    }

    #[test]
    fn test_event_sink_flushes_errors_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let sink = EventSink::open(dir.path(), "r-err").unwrap();
        let line = format_record(Level::Error, "system", "run_failed", obj(&[]));
        sink.write_line(Level::Error, &line);

        // no explicit flush
        let raw = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.contains("run_failed"));
    }

    #[test]
    fn test_rejected_config_failure_record() {
        let cfg = crate::config::Config {
            doors: 2,
            ..crate::config::Config::default()
        };
        let err = cfg.validate().unwrap_err();
        let line = format_record(
            Level::Error,
            Domain::System.as_str(),
            "run_failed",
            failure_fields("montyhall", &err.to_string()),
        );
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["lvl"], "ERROR");
        assert_eq!(v["data"]["binary"], "montyhall");
        assert!(v["data"]["error"].as_str().unwrap().contains("2 doors"));
    }

    #[test]
    fn test_event_sink_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        for event in ["first", "second"] {
            let sink = EventSink::open(dir.path(), "r-append").unwrap();
            sink.write_line(Level::Info, event);
            sink.flush();
        }
        let raw = std::fs::read_to_string(dir.path().join("r-append").join("events.jsonl")).unwrap();
        assert_eq!(raw.lines().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
