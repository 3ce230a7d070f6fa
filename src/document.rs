use crate::diagnostics::Diagnostics;
use crate::error::FormatError;
use crate::event::LogEvent;
use crate::formatter::FieldFormatter;
use crate::registry::FieldSpec;
use crate::value::FieldValue;
use bson::Document;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Build the document for one event.
///
/// Fields are written in registration order. A field whose formatter is
/// unset is skipped; a field whose formatter fails (error or panic) is
/// reported to `diagnostics` and left out. Later duplicates of a name
/// overwrite the earlier value in place.
pub fn build_document(event: &LogEvent, fields: &[FieldSpec], diagnostics: &dyn Diagnostics) -> Document {
    let mut doc = Document::new();

    for spec in fields {
        let Some(formatter) = &spec.formatter else {
            continue;
        };

        match run_formatter(formatter.as_ref(), event) {
            Ok(value) => {
                doc.insert(spec.name.clone(), value.into_bson());
            }
            Err(e) => {
                diagnostics.report(&format!("failed to format field {:?}: {}", spec.name, e));
            }
        }
    }

    doc
}

fn run_formatter(formatter: &dyn FieldFormatter, event: &LogEvent) -> Result<FieldValue, FormatError> {
    match catch_unwind(AssertUnwindSafe(|| formatter.format(event))) {
        Ok(result) => result,
        Err(payload) => Err(FormatError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemoryDiagnostics;
    use crate::formatter::{LevelFormatter, MessageFormatter};
    use bson::{doc, Bson};
    use tracing::Level;

    fn failing(_: &LogEvent) -> Result<FieldValue, FormatError> {
        Err(FormatError::msg("property lookup failed"))
    }

    fn panicking(_: &LogEvent) -> Result<FieldValue, FormatError> {
        panic!("formatter exploded")
    }

    #[test]
    fn level_scenario() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![FieldSpec::new("level", LevelFormatter)];
        let doc = build_document(&LogEvent::new(Level::INFO, "hello"), &fields, &diagnostics);
        assert_eq!(doc, doc! { "level": "INFO" });
        assert!(diagnostics.faults().is_empty());
    }

    #[test]
    fn failing_field_is_isolated() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![
            FieldSpec::new("broken", failing),
            FieldSpec::new("message", MessageFormatter),
        ];
        let doc = build_document(&LogEvent::new(Level::WARN, "kept"), &fields, &diagnostics);

        assert_eq!(doc, doc! { "message": "kept" });
        let faults = diagnostics.faults();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].contains("broken"));
        assert!(faults[0].contains("property lookup failed"));
    }

    #[test]
    fn panicking_field_is_isolated() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![
            FieldSpec::new("level", LevelFormatter),
            FieldSpec::new("boom", panicking),
            FieldSpec::new("message", MessageFormatter),
        ];
        let doc = build_document(&LogEvent::new(Level::ERROR, "still here"), &fields, &diagnostics);

        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["level", "message"]);
        assert!(diagnostics.faults()[0].contains("formatter exploded"));
    }

    #[test]
    fn unset_formatter_is_skipped_without_diagnostic() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![FieldSpec::unset("nothing"), FieldSpec::new("level", LevelFormatter)];
        let doc = build_document(&LogEvent::new(Level::DEBUG, "x"), &fields, &diagnostics);
        assert_eq!(doc, doc! { "level": "DEBUG" });
        assert!(diagnostics.faults().is_empty());
    }

    #[test]
    fn field_order_follows_registration() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![
            FieldSpec::new("message", MessageFormatter),
            FieldSpec::new("skipped", failing),
            FieldSpec::new("level", LevelFormatter),
        ];
        let doc = build_document(&LogEvent::new(Level::INFO, "m"), &fields, &diagnostics);
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["message", "level"]);
    }

    #[test]
    fn duplicate_names_last_write_wins() {
        let diagnostics = MemoryDiagnostics::new();
        let fields = vec![
            FieldSpec::new("value", LevelFormatter),
            FieldSpec::new("other", MessageFormatter),
            FieldSpec::new("value", MessageFormatter),
        ];
        let doc = build_document(&LogEvent::new(Level::INFO, "second"), &fields, &diagnostics);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("value"), Some(&Bson::String("second".into())));
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["value", "other"]);
    }
}
