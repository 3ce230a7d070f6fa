use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use tracing::Level;

/// A single log event as delivered to the appender.
///
/// Events are produced by the logging layer (or by hand in tests) and are
/// only ever read by formatters.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(serialize_with = "serialize_level")]
    pub level: Level,
    pub target: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Name of the originating thread, or its id when unnamed.
    pub thread: String,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub message: Option<String>,
    pub error: Option<ErrorInfo>,
}

/// Rendered form of an error attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    /// Messages of the `source()` chain, outermost first.
    pub sources: Vec<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: Vec::new(),
        }
    }

    /// Capture an error together with its full source chain.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut current = err.source();
        while let Some(source) = current {
            sources.push(source.to_string());
            current = source.source();
        }
        Self {
            message: err.to_string(),
            sources,
        }
    }

    /// Multi-line rendering: the message followed by one `caused by:` line
    /// per source.
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for source in &self.sources {
            out.push_str("\ncaused by: ");
            out.push_str(source);
        }
        out
    }
}

impl LogEvent {
    /// Create an event stamped with the current time and thread.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            target: String::new(),
            module_path: None,
            file: None,
            line: None,
            thread: current_thread_name(),
            fields: BTreeMap::new(),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }
}

/// Name of the calling thread, falling back to its `ThreadId`.
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}

fn serialize_level<S: serde::Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(level.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection reset")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_info_captures_source_chain() {
        let info = ErrorInfo::from_error(&Outer(Inner));
        assert_eq!(info.message, "request failed");
        assert_eq!(info.sources, vec!["connection reset".to_string()]);
        assert_eq!(info.render(), "request failed\ncaused by: connection reset");
    }

    #[test]
    fn event_serializes_level_as_text() {
        let event = LogEvent::new(Level::WARN, "disk almost full").with_field("free_mb", 12);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "disk almost full");
        assert_eq!(value["fields"]["free_mb"], 12);
    }
}
