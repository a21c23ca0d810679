//! Injectable logging capability.
//!
//! Every engine owns a [`Logger`] handle. Handles are cheap to clone and
//! clones share prefix, debug toggle and sink, so one logger can be handed to
//! several engines. The default sink forwards to the [`log`] facade under the
//! `pika` target; tests and tools can swap in any [`LogSink`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Destination for log records.
pub trait LogSink {
    fn log(&self, level: LogLevel, prefix: &str, message: &str);
}

/// Sink forwarding to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: LogLevel, prefix: &str, message: &str) {
        log::log!(target: "pika", log::Level::from(level), "{}[{}] {}", prefix, level, message);
    }
}

/// A record captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RefCell<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured records.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Captured messages at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, level: LogLevel, _prefix: &str, message: &str) {
        self.records.borrow_mut().push(LogRecord {
            level,
            message: message.to_string(),
        });
    }
}

struct LoggerInner {
    prefix: RefCell<String>,
    debug: Cell<bool>,
    sink: RefCell<Rc<dyn LogSink>>,
}

/// Shared logging handle with a prefix and a debug toggle.
///
/// Debug records are dropped unless debugging is enabled.
#[derive(Clone)]
pub struct Logger {
    inner: Rc<LoggerInner>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("[pika]")
    }
}

impl Logger {
    /// Creates a logger writing to the `log` crate.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_sink(prefix, Rc::new(LogCrateSink))
    }

    /// Creates a logger writing to `sink`.
    pub fn with_sink(prefix: impl Into<String>, sink: Rc<dyn LogSink>) -> Self {
        Self {
            inner: Rc::new(LoggerInner {
                prefix: RefCell::new(prefix.into()),
                debug: Cell::new(false),
                sink: RefCell::new(sink),
            }),
        }
    }

    pub fn prefix(&self) -> String {
        self.inner.prefix.borrow().clone()
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        *self.inner.prefix.borrow_mut() = prefix.into();
    }

    /// Replaces the sink for this handle and all its clones.
    pub fn set_sink(&self, sink: Rc<dyn LogSink>) {
        *self.inner.sink.borrow_mut() = sink;
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.inner.debug.get()
    }

    pub fn set_debug(&self, enabled: bool) {
        self.inner.debug.set(enabled);
    }

    /// Flips the debug toggle and returns the new state.
    pub fn toggle_debug(&self) -> bool {
        let enabled = !self.inner.debug.get();
        self.inner.debug.set(enabled);
        enabled
    }

    pub fn debug(&self, message: impl fmt::Display) {
        if self.is_debug_enabled() {
            self.emit(LogLevel::Debug, &message.to_string());
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Info, &message.to_string());
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Warn, &message.to_string());
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Error, &message.to_string());
    }

    fn emit(&self, level: LogLevel, message: &str) {
        let sink = self.inner.sink.borrow().clone();
        let prefix = self.inner.prefix.borrow().clone();
        sink.log(level, &prefix, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &*self.inner.prefix.borrow())
            .field("debug", &self.inner.debug.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Mutex;

    struct Captured;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    impl log::Log for Captured {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.target() == "pika"
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                if let Ok(mut lines) = CAPTURED.lock() {
                    lines.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE_LOGGER: Captured = Captured;

    fn install_capture() {
        let _ = log::set_logger(&CAPTURE_LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
        CAPTURED.lock().unwrap().clear();
    }

    #[test]
    fn test_debug_is_off_by_default() {
        let sink = Rc::new(MemorySink::new());
        let logger = Logger::with_sink("[t]", sink.clone());

        logger.debug("hidden");
        logger.info("shown");
        assert_eq!(sink.records().len(), 1);

        assert!(logger.toggle_debug());
        logger.debug("visible");
        assert_eq!(sink.messages(LogLevel::Debug), vec!["visible".to_string()]);
    }

    #[test]
    fn test_clones_share_state() {
        let sink = Rc::new(MemorySink::new());
        let logger = Logger::with_sink("[a]", sink.clone());
        let clone = logger.clone();

        clone.set_prefix("[b]");
        clone.set_debug(true);
        assert_eq!(logger.prefix(), "[b]");
        assert!(logger.is_debug_enabled());

        let other = Rc::new(MemorySink::new());
        logger.set_sink(other.clone());
        clone.warn("moved");
        assert!(sink.records().is_empty());
        assert_eq!(other.messages(LogLevel::Warn), vec!["moved".to_string()]);
    }

    #[test]
    #[serial]
    fn test_default_sink_forwards_to_log_crate() {
        install_capture();
        let logger = Logger::default();
        logger.warn("unknown layer");

        let lines = CAPTURED.lock().unwrap().clone();
        assert!(lines.contains(&"[pika][WARN] unknown layer".to_string()));
    }

    #[test]
    #[serial]
    fn test_default_sink_respects_debug_toggle() {
        install_capture();
        let logger = Logger::new("[x]");
        logger.debug("quiet");
        logger.set_debug(true);
        logger.debug("loud");

        let lines: Vec<String> = CAPTURED
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.starts_with("[x]"))
            .cloned()
            .collect();
        assert_eq!(lines, vec!["[x][DEBUG] loud".to_string()]);
    }
}
