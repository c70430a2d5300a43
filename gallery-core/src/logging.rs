//! Structured logging collaborator.
//!
//! Components that log take an `Arc<dyn GatewayLogger>` instead of calling a
//! global logger, so tests can swap in [`MemoryLogger`] and assert on what was
//! (and was not) reported.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A `(name, value)` pair attached to a log entry.
pub type LogField<'a> = (&'a str, &'a dyn fmt::Display);

pub trait GatewayLogger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, fields: &[LogField<'_>]);

    fn debug(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(LogLevel::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(LogLevel::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(LogLevel::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(LogLevel::Error, message, fields);
    }
}

/// Field names recorded as first-class `tracing` fields; any other field is
/// flattened into `extra` as `k=v` pairs.
const STRUCTURED_FIELDS: [&str; 4] = ["key", "prefix", "store", "cause"];

fn structured(fields: &[LogField<'_>], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, value)| value.to_string())
}

fn render_extra(fields: &[LogField<'_>]) -> Option<String> {
    let rest: Vec<String> = fields
        .iter()
        .filter(|(name, _)| !STRUCTURED_FIELDS.contains(name))
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    (!rest.is_empty()).then(|| rest.join(" "))
}

/// Forwards to `tracing` events under the `gallery` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn shared() -> Arc<dyn GatewayLogger> {
        Arc::new(Self)
    }
}

macro_rules! gallery_event {
    ($level:expr, $message:expr, $fields:expr) => {{
        let fields = $fields;
        let key = structured(fields, "key");
        let prefix = structured(fields, "prefix");
        let store = structured(fields, "store");
        let cause = structured(fields, "cause");
        let extra = render_extra(fields);
        tracing::event!(
            target: "gallery",
            $level,
            key = key.as_deref(),
            prefix = prefix.as_deref(),
            store = store.as_deref(),
            cause = cause.as_deref(),
            extra = extra.as_deref(),
            "{}",
            $message
        )
    }};
}

impl GatewayLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[LogField<'_>]) {
        match level {
            LogLevel::Debug => gallery_event!(tracing::Level::DEBUG, message, fields),
            LogLevel::Info => gallery_event!(tracing::Level::INFO, message, fields),
            LogLevel::Warn => gallery_event!(tracing::Level::WARN, message, fields),
            LogLevel::Error => gallery_event!(tracing::Level::ERROR, message, fields),
        }
    }
}

/// One captured entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }
}

impl GatewayLogger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &[LogField<'_>]) {
        let fields = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            fields,
        });
    }
}
