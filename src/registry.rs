use crate::formatter::{
    Exception, FieldFormatter, LevelFormatter, Location, MessageFormatter, Properties,
    TargetFormatter, ThreadFormatter, Timestamp,
};
use std::fmt;
use std::sync::Arc;

/// One configured document field: an output name and the formatter that
/// produces its value. A spec without a formatter is skipped silently.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub formatter: Option<Arc<dyn FieldFormatter>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, formatter: impl FieldFormatter + 'static) -> Self {
        Self {
            name: name.into(),
            formatter: Some(Arc::new(formatter)),
        }
    }

    /// A field whose formatter was never set.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formatter: None,
        }
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("formatter", &self.formatter.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Ordered list of [`FieldSpec`]s. Names are not checked for uniqueness.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    specs: Vec<FieldSpec>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping used when nothing was configured.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FieldSpec::new("timestamp", Timestamp::native()));
        registry.register(FieldSpec::new("level", LevelFormatter));
        registry.register(FieldSpec::new("thread", ThreadFormatter));
        registry.register(FieldSpec::new("message", MessageFormatter));
        registry.register(FieldSpec::new("loggerName", TargetFormatter));
        registry.register(FieldSpec::new("fileName", Location::File));
        registry.register(FieldSpec::new("lineNumber", Location::Line));
        registry.register(FieldSpec::new("moduleName", Location::ModulePath));
        registry.register(FieldSpec::new("properties", Properties));
        registry.register(FieldSpec::new("exception", Exception));
        registry
    }

    pub fn register(&mut self, spec: FieldSpec) {
        self.specs.push(spec);
    }

    pub fn list(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl FromIterator<FieldSpec> for FieldRegistry {
    fn from_iter<I: IntoIterator<Item = FieldSpec>>(iter: I) -> Self {
        Self {
            specs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_registration_order_and_duplicates() {
        let mut registry = FieldRegistry::new();
        registry.register(FieldSpec::new("b", LevelFormatter));
        registry.register(FieldSpec::unset("a"));
        registry.register(FieldSpec::new("b", MessageFormatter));

        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "b"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.list()[1].formatter.is_none());
    }

    #[test]
    fn defaults_cover_core_event_data() {
        let registry = FieldRegistry::with_defaults();
        let names: Vec<&str> = registry.list().iter().map(|s| s.name.as_str()).collect();
        for expected in ["timestamp", "level", "thread", "message", "exception"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert!(registry.list().iter().all(|s| s.formatter.is_some()));
    }
}
