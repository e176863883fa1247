//! Severity levels and the sinks that receive request log lines.
//!
//! # Design
//! There is no process-wide logging setup in this crate. Whoever builds a
//! `RequestExecutor` also builds the `LogSink` it writes to and owns that
//! sink's lifetime. Three sinks ship with the crate:
//!
//! - `TracingSink` forwards each line as a `tracing` event, so an application
//!   that already installed a subscriber gets adapter lines for free.
//! - `FileSink` appends `timestamp - LEVEL - message` lines to a file through
//!   its own `tracing` dispatcher: a `tracing-appender` writer behind a
//!   non-blocking worker, formatted by a `tracing-subscriber` fmt layer. The
//!   dispatcher is entered only for the duration of each record, so the
//!   application's global subscriber is never replaced.
//! - `MemorySink` keeps lines in memory for assertions.
//!
//! Mapping a `Severity` onto a sink's native level is always an exhaustive
//! `match`; `Severity::NotSet` is the explicit "record nothing" case.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDateTime};
use tracing::{Dispatch, Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::error::AdapterError;

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Produced by unrecognized labels. Sinks drop these records.
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::NotSet => "NOTSET",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Strict, case-insensitive parse. `FATAL` and `WARN` are accepted as
    /// aliases. `NOTSET` is not a label callers may ask for.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Severity::Debug),
            "INFO" => Some(Severity::Info),
            "WARNING" | "WARN" => Some(Severity::Warning),
            "ERROR" => Some(Severity::Error),
            "CRITICAL" | "FATAL" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Total parse: anything unrecognized becomes `NotSet`.
    pub fn from_label_lenient(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Severity::NotSet)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives `(severity, message)` pairs and records the message verbatim.
pub trait LogSink {
    fn log(&self, severity: Severity, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for &S {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message)
    }
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message)
    }
}

// ---------------------------------------------------------------------------
// tracing
// ---------------------------------------------------------------------------

/// Forwards records to `tracing` under the `rest_adapter` target.
///
/// `tracing` has no level above `ERROR`, so `Critical` is emitted at
/// `ERROR` with `critical = true` attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::NotSet => {}
            Severity::Debug => tracing::debug!(target: "rest_adapter", "{message}"),
            Severity::Info => tracing::info!(target: "rest_adapter", "{message}"),
            Severity::Warning => tracing::warn!(target: "rest_adapter", "{message}"),
            Severity::Error => tracing::error!(target: "rest_adapter", "{message}"),
            Severity::Critical => {
                tracing::error!(target: "rest_adapter", critical = true, "{message}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// file
// ---------------------------------------------------------------------------

/// Appends formatted records to a log file.
///
/// Records below `threshold` are dropped, as are `NotSet` records. Lines are
/// handed to a background writer; dropping the sink flushes whatever is
/// still queued.
pub struct FileSink {
    path: PathBuf,
    threshold: Severity,
    dispatch: Dispatch,
    _guard: WorkerGuard,
}

impl FileSink {
    /// Open `path` for appending, creating the file and its parent
    /// directories when missing.
    pub fn open(path: impl AsRef<Path>, threshold: Severity) -> Result<Self, AdapterError> {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .ok_or_else(|| AdapterError::InvalidSetting {
                name: "log_file",
                value: path.display().to_string(),
            })?
            .to_string_lossy()
            .into_owned();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(file_name)
            .build(dir)
            .map_err(|source| AdapterError::LogFile {
                path: path.clone(),
                source,
            })?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .event_format(RecordFormat)
            .finish();

        Ok(Self {
            path,
            threshold,
            dispatch: Dispatch::new(subscriber),
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    fn accepts(&self, severity: Severity) -> bool {
        severity != Severity::NotSet && severity >= self.threshold
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSink")
            .field("path", &self.path)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl LogSink for FileSink {
    fn log(&self, severity: Severity, message: &str) {
        if !self.accepts(severity) {
            return;
        }
        tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::info!(target: "rest_adapter::file", severity = severity.label(), "{message}");
        });
    }
}

/// Render one file line: `2024-01-02 03:04:05,006 - ERROR - message`.
pub fn format_record(timestamp: NaiveDateTime, level: &str, message: &str) -> String {
    format!(
        "{} - {} - {}",
        timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
        level,
        message
    )
}

/// Event format for `FileSink`: the `severity` field replaces the `tracing`
/// level, since `tracing` has neither `WARNING` nor `CRITICAL`.
struct RecordFormat;

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);
        let level = visitor
            .severity
            .unwrap_or_else(|| event.metadata().level().to_string());
        writeln!(
            writer,
            "{}",
            format_record(Local::now().naive_local(), &level, &visitor.message)
        )
    }
}

#[derive(Default)]
struct RecordVisitor {
    severity: Option<String>,
    message: String,
}

impl tracing::field::Visit for RecordVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "severity" => self.severity = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// memory
// ---------------------------------------------------------------------------

/// Keeps every record in call order. Nothing is filtered, `NotSet`
/// included, so tests can observe what an executor actually emitted.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, m)| m).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, severity: Severity, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tracing_test::traced_test;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::NotSet < Severity::Debug);
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn strict_parse_accepts_known_labels_in_any_case() {
        assert_eq!(Severity::from_label("debug"), Some(Severity::Debug));
        assert_eq!(Severity::from_label("Info"), Some(Severity::Info));
        assert_eq!(Severity::from_label("WARNING"), Some(Severity::Warning));
        assert_eq!(Severity::from_label("warn"), Some(Severity::Warning));
        assert_eq!(Severity::from_label("error"), Some(Severity::Error));
        assert_eq!(Severity::from_label("critical"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("FATAL"), Some(Severity::Critical));
        assert_eq!(Severity::from_label("VERBOSE"), None);
        assert_eq!(Severity::from_label("NOTSET"), None);
    }

    #[test]
    fn lenient_parse_degrades_to_not_set() {
        assert_eq!(Severity::from_label_lenient("VERBOSE"), Severity::NotSet);
        assert_eq!(Severity::from_label_lenient(""), Severity::NotSet);
        assert_eq!(Severity::from_label_lenient("error"), Severity::Error);
    }

    #[test]
    fn record_format_matches_file_layout() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 6)
            .unwrap();
        assert_eq!(
            format_record(ts, Severity::Error.label(), "method=GET, url=https://host/, params=[]"),
            "2024-01-02 03:04:05,006 - ERROR - method=GET, url=https://host/, params=[]"
        );
    }

    #[test]
    fn memory_sink_keeps_call_order() {
        let sink = MemorySink::new();
        sink.log(Severity::Debug, "first");
        sink.log(Severity::NotSet, "second");
        sink.log(Severity::Error, "third");
        assert_eq!(
            sink.records(),
            vec![
                (Severity::Debug, "first".to_string()),
                (Severity::NotSet, "second".to_string()),
                (Severity::Error, "third".to_string()),
            ]
        );
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn sinks_work_through_shared_references() {
        let sink = Arc::new(MemorySink::new());
        let boxed: Box<dyn LogSink> = Box::new(Arc::clone(&sink));
        boxed.log(Severity::Info, "via box");
        let by_ref: &dyn LogSink = &*sink;
        by_ref.log(Severity::Info, "via ref");
        assert_eq!(sink.messages(), vec!["via box", "via ref"]);
    }

    #[traced_test]
    #[test]
    fn tracing_sink_maps_each_severity_to_a_level() {
        let sink = TracingSink;
        sink.log(Severity::NotSet, "notset record");
        sink.log(Severity::Debug, "debug record");
        sink.log(Severity::Info, "info record");
        sink.log(Severity::Warning, "warning record");
        sink.log(Severity::Error, "error record");
        sink.log(Severity::Critical, "critical record");

        logs_assert(|lines: &[&str]| {
            let expected = [
                ("debug record", "DEBUG"),
                ("info record", "INFO"),
                ("warning record", "WARN"),
                ("error record", "ERROR"),
                ("critical record", "ERROR"),
            ];
            for (message, level) in expected {
                let line = lines
                    .iter()
                    .find(|line| line.contains(message))
                    .ok_or_else(|| format!("{message} was not emitted"))?;
                if !line.contains(level) || !line.contains("rest_adapter") {
                    return Err(format!("{message} emitted as {line}"));
                }
            }
            if lines.iter().any(|line| line.contains("notset record")) {
                return Err("NotSet record reached tracing".to_string());
            }
            Ok(())
        });
    }

    #[traced_test]
    #[test]
    fn tracing_sink_flags_critical_records() {
        TracingSink.log(Severity::Critical, "disk on fire");
        TracingSink.log(Severity::Error, "plain failure");

        logs_assert(|lines: &[&str]| {
            let flagged = |needle: &str| {
                lines
                    .iter()
                    .any(|line| line.contains(needle) && line.contains("critical=true"))
            };
            match (flagged("disk on fire"), flagged("plain failure")) {
                (true, false) => Ok(()),
                other => Err(format!("critical flags (critical, error) = {other:?}")),
            }
        });
    }

    #[traced_test]
    #[test]
    fn file_sink_does_not_leak_into_global_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.log");
        let sink = FileSink::open(&path, Severity::Debug).unwrap();
        sink.log(Severity::Error, "file only record");
        drop(sink);

        assert!(!logs_contain("file only record"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(" - ERROR - file only record"));
    }

    #[test]
    fn file_sink_filters_below_threshold_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("adapter.log");

        let sink = FileSink::open(&path, Severity::Warning).unwrap();
        sink.log(Severity::Debug, "dropped debug");
        sink.log(Severity::NotSet, "dropped notset");
        sink.log(Severity::Warning, "kept warning");
        sink.log(Severity::Critical, "kept critical");
        drop(sink);

        let reopened = FileSink::open(&path, Severity::Debug).unwrap();
        assert_eq!(reopened.path(), path.as_path());
        reopened.log(Severity::Debug, "kept after reopen");
        drop(reopened);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" - WARNING - kept warning"));
        assert!(lines[1].ends_with(" - CRITICAL - kept critical"));
        assert!(lines[2].ends_with(" - DEBUG - kept after reopen"));

        // `2024-01-02 03:04:05,006` prefix on every line.
        for line in lines {
            let (timestamp, _) = line.split_once(" - ").unwrap();
            assert_eq!(timestamp.len(), 23, "{line}");
            assert_eq!(timestamp.as_bytes()[19], b',', "{line}");
        }
    }

    #[test]
    fn file_sink_keeps_records_from_concurrent_callers_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.log");
        let sink = Arc::new(FileSink::open(&path, Severity::Debug).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        sink.log(Severity::Info, &format!("worker={worker} n={n}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 100);
        assert!(lines
            .iter()
            .all(|line| line.contains(" - INFO - worker=") && line.contains(" n=")));
    }

    #[test]
    fn file_sink_reports_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let err = FileSink::open(dir.path(), Severity::Debug).unwrap_err();
        assert!(matches!(err, AdapterError::LogFile { .. }));
    }
}
