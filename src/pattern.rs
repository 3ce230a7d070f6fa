//! Conversion-pattern layout, rendering an event to text.
//!
//! Supported conversions:
//!
//! | token | output |
//! |---|---|
//! | `%timestamp` / `%date` | RFC 3339 timestamp |
//! | `%date{fmt}` | timestamp rendered with a `chrono` format string |
//! | `%level` | severity, e.g. `ERROR` |
//! | `%message` | rendered message |
//! | `%thread` | originating thread |
//! | `%logger` | event target |
//! | `%property{key}` | one structured property, `(null)` when missing |
//! | `%exception` | rendered error with its causes, empty when none |
//! | `%newline` | `\n` |
//! | `%%` | a literal `%` |

use crate::error::{ConfigError, FormatError};
use crate::event::LogEvent;
use crate::formatter::{check_timestamp_format, render_timestamp, FieldFormatter};
use crate::value::FieldValue;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Timestamp(Option<String>),
    Level,
    Message,
    Thread,
    Logger,
    Property(String),
    Exception,
}

/// Formatter that renders a parsed conversion pattern to a text value.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = pattern;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(stripped) = rest.strip_prefix('%') {
                literal.push('%');
                rest = stripped;
                continue;
            }

            let name_len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            if name_len == 0 {
                return Err(invalid("dangling '%'".to_string()));
            }
            let name = &rest[..name_len];
            rest = &rest[name_len..];

            let mut option = None;
            if let Some(after_brace) = rest.strip_prefix('{') {
                let close = after_brace
                    .find('}')
                    .ok_or_else(|| invalid(format!("unclosed option for %{}", name)))?;
                option = Some(after_brace[..close].to_string());
                rest = &after_brace[close + 1..];
            }

            let segment = match (name, option) {
                ("newline", None) => {
                    literal.push('\n');
                    continue;
                }
                ("timestamp", None) => Segment::Timestamp(None),
                ("date", Some(fmt)) => {
                    check_timestamp_format(&fmt).map_err(invalid)?;
                    Segment::Timestamp(Some(fmt))
                }
                ("date", None) => Segment::Timestamp(None),
                ("level", None) => Segment::Level,
                ("message", None) => Segment::Message,
                ("thread", None) => Segment::Thread,
                ("logger", None) => Segment::Logger,
                ("exception", None) => Segment::Exception,
                ("property", Some(key)) if !key.is_empty() => Segment::Property(key),
                ("property", _) => return Err(invalid("%property needs a {key}".to_string())),
                (other, _) => return Err(invalid(format!("unknown conversion %{}", other))),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn render(&self, event: &LogEvent) -> Result<String, FormatError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Timestamp(None) => out.push_str(&event.timestamp.to_rfc3339()),
                Segment::Timestamp(Some(fmt)) => out.push_str(&render_timestamp(event, fmt)?),
                Segment::Level => out.push_str(event.level.as_str()),
                Segment::Message => out.push_str(event.message.as_deref().unwrap_or_default()),
                Segment::Thread => out.push_str(&event.thread),
                Segment::Logger => out.push_str(&event.target),
                Segment::Property(key) => match event.fields.get(key) {
                    Some(serde_json::Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => out.push_str("(null)"),
                },
                Segment::Exception => {
                    if let Some(error) = &event.error {
                        out.push_str(&error.render());
                    }
                }
            }
        }
        Ok(out)
    }
}

impl FieldFormatter for Pattern {
    fn format(&self, event: &LogEvent) -> Result<FieldValue, FormatError> {
        self.render(event).map(FieldValue::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ErrorInfo;
    use chrono::{TimeZone, Utc};
    use tracing::Level;

    fn event() -> LogEvent {
        LogEvent::new(Level::ERROR, "payment declined")
            .with_target("billing")
            .with_thread("main")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_field("order", "A-17")
            .with_field("amount", 30)
    }

    #[test]
    fn renders_common_conversions() {
        let pattern = Pattern::parse("%date{%H:%M:%S} [%thread] %level %logger - %message").unwrap();
        assert_eq!(
            pattern.render(&event()).unwrap(),
            "03:04:05 [main] ERROR billing - payment declined"
        );
    }

    #[test]
    fn renders_properties_and_escapes() {
        let pattern = Pattern::parse("order=%property{order} amount=%property{amount} x=%property{x} 100%%").unwrap();
        assert_eq!(pattern.render(&event()).unwrap(), "order=A-17 amount=30 x=(null) 100%");
    }

    #[test]
    fn renders_exception_and_newline() {
        let pattern = Pattern::parse("%message%newline%exception").unwrap();
        let e = event().with_error(ErrorInfo::new("card expired"));
        assert_eq!(pattern.render(&e).unwrap(), "payment declined\ncard expired");
        assert_eq!(pattern.render(&event()).unwrap(), "payment declined\n");
    }

    #[test]
    fn rejects_unknown_and_malformed_conversions() {
        assert!(matches!(Pattern::parse("%bogus"), Err(ConfigError::InvalidPattern { .. })));
        assert!(Pattern::parse("%property").is_err());
        assert!(Pattern::parse("%date{%H").is_err());
        assert!(matches!(
            Pattern::parse("%date{%Q} %message"),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(Pattern::parse("trailing %").is_err());
    }
}
