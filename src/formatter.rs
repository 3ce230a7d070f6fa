use crate::error::{ConfigError, FormatError};
use crate::event::LogEvent;
use crate::value::FieldValue;
use bson::Bson;

/// Strategy turning a [`LogEvent`] into the value of one document field.
///
/// Each configured field owns its own formatter. Failures are reported per
/// field and never abort the rest of the document.
pub trait FieldFormatter: Send + Sync {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError>;
}

impl<F> FieldFormatter for F
where
    F: Fn(&LogEvent) -> Result<FieldValue, FormatError> + Send + Sync,
{
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        self(event)
    }
}

/// Event timestamp, either as a native date-time or rendered with a
/// `chrono` format string.
#[derive(Debug, Clone, Default)]
pub struct Timestamp {
    pub format: Option<String>,
}

impl Timestamp {
    pub fn native() -> Self {
        Self { format: None }
    }

    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
        }
    }

    /// Like [`Timestamp::with_format`], but rejects a format string with an
    /// unknown specifier up front.
    pub fn parse(format: &str) -> Result<Self, ConfigError> {
        check_timestamp_format(format).map_err(|reason| ConfigError::InvalidPattern {
            pattern: format.to_string(),
            reason,
        })?;
        Ok(Self::with_format(format))
    }
}

/// Fails when `fmt` contains a specifier `chrono` cannot render.
pub(crate) fn check_timestamp_format(fmt: &str) -> Result<(), String> {
    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid timestamp format {:?}", fmt));
    }
    Ok(())
}

impl FieldFormatter for Timestamp {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        match &self.format {
            None => Ok(FieldValue::Time(event.timestamp)),
            Some(fmt) => render_timestamp(event, fmt).map(FieldValue::Text),
        }
    }
}

/// Render the event timestamp with `fmt`, failing on an invalid specifier
/// instead of panicking inside `Display`.
pub(crate) fn render_timestamp(event: &LogEvent, fmt: &str) -> Result<String, FormatError> {
    use std::fmt::Write;

    let mut out = String::new();
    write!(out, "{}", event.timestamp.format(fmt))
        .map_err(|_| FormatError::msg(format!("invalid timestamp format {:?}", fmt)))?;
    Ok(out)
}

/// Severity level as upper-case text, e.g. `"INFO"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelFormatter;

impl FieldFormatter for LevelFormatter {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(FieldValue::Text(event.level.to_string()))
    }
}

/// Rendered message; null for events without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter;

impl FieldFormatter for MessageFormatter {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(event.message.clone().into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadFormatter;

impl FieldFormatter for ThreadFormatter {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(FieldValue::Text(event.thread.clone()))
    }
}

/// Event target, the logger name in `tracing` terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetFormatter;

impl FieldFormatter for TargetFormatter {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(FieldValue::Text(event.target.clone()))
    }
}

/// One piece of the event's source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    File,
    Line,
    ModulePath,
}

impl FieldFormatter for Location {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(match self {
            Location::File => event.file.clone().into(),
            Location::Line => event.line.into(),
            Location::ModulePath => event.module_path.clone().into(),
        })
    }
}

/// A single structured property of the event; null when the event does
/// not carry it.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FieldFormatter for Property {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(event.fields.get(&self.name).cloned().into())
    }
}

/// All structured properties as one sub-document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Properties;

impl FieldFormatter for Properties {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(FieldValue::Map(
            event
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::Json(v.clone())))
                .collect(),
        ))
    }
}

/// Attached error as `{ message, sources }`, or null.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exception;

impl FieldFormatter for Exception {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        let Some(error) = &event.error else {
            return Ok(FieldValue::Null);
        };
        Ok(FieldValue::Map(vec![
            ("message".to_string(), FieldValue::Text(error.message.clone())),
            ("sources".to_string(), error.sources.clone().into()),
        ]))
    }
}

/// A constant value written on every document.
#[derive(Debug, Clone)]
pub struct Literal(pub Bson);

impl FieldFormatter for Literal {
    fn format(&self, _event: &LogEvent) -> Result<FieldValue, FormatError> {
        Ok(FieldValue::Native(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ErrorInfo;
    use chrono::{TimeZone, Utc};
    use tracing::Level;

    fn event() -> LogEvent {
        LogEvent::new(Level::INFO, "user signed in")
            .with_target("auth::login")
            .with_thread("worker-1")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 9, 8, 15, 0).unwrap())
            .with_location("src/login.rs", 42)
            .with_field("user_id", 7)
    }

    #[test]
    fn level_renders_upper_case() {
        assert_eq!(LevelFormatter.format(&event()).unwrap(), FieldValue::Text("INFO".into()));
    }

    #[test]
    fn timestamp_native_and_formatted() {
        let e = event();
        assert_eq!(Timestamp::native().format(&e).unwrap(), FieldValue::Time(e.timestamp));
        assert_eq!(
            Timestamp::with_format("%Y-%m-%d %H:%M").format(&e).unwrap(),
            FieldValue::Text("2024-03-09 08:15".into())
        );
    }

    #[test]
    fn invalid_timestamp_format_is_an_error() {
        assert!(Timestamp::with_format("%Q").format(&event()).is_err());
    }

    #[test]
    fn timestamp_format_is_checked_at_construction() {
        assert!(Timestamp::parse("%Y-%m-%dT%H:%M:%S%.3f").is_ok());
        assert!(matches!(Timestamp::parse("%Q"), Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn location_parts() {
        let e = event();
        assert_eq!(Location::File.format(&e).unwrap(), FieldValue::Text("src/login.rs".into()));
        assert_eq!(Location::Line.format(&e).unwrap(), FieldValue::Int(42));
        assert_eq!(Location::ModulePath.format(&e).unwrap(), FieldValue::Null);
    }

    #[test]
    fn property_present_and_missing() {
        let e = event();
        assert_eq!(
            Property::new("user_id").format(&e).unwrap(),
            FieldValue::Json(serde_json::json!(7))
        );
        assert_eq!(Property::new("missing").format(&e).unwrap(), FieldValue::Null);
    }

    #[test]
    fn exception_rendering() {
        assert_eq!(Exception.format(&event()).unwrap(), FieldValue::Null);

        let mut err = ErrorInfo::new("boom");
        err.sources.push("io".to_string());
        let value = Exception.format(&event().with_error(err)).unwrap().into_bson();
        assert_eq!(value, Bson::Document(bson::doc! { "message": "boom", "sources": ["io"] }));
    }

    #[test]
    fn closures_are_formatters() {
        let f = |e: &LogEvent| -> Result<FieldValue, FormatError> { Ok(e.thread.clone().into()) };
        assert_eq!(f.format(&event()).unwrap(), FieldValue::Text("worker-1".into()));
    }
}
