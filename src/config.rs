use crate::appender::{ConnectionSettings, MongoAppender};
use crate::env::{env_opt, LOG_SINK_COLLECTION_ENV, LOG_SINK_CONNECTION_STRING_ENV, LOG_SINK_CONNECTION_STRING_NAME_ENV};
use crate::error::ConfigError;
use crate::formatter::{
    Exception, FieldFormatter, LevelFormatter, Literal, Location, MessageFormatter, Properties,
    Property, TargetFormatter, ThreadFormatter, Timestamp,
};
use crate::pattern::Pattern;
use crate::registry::{FieldRegistry, FieldSpec};
use crate::store::StoreConnector;
use crate::value::json_to_bson;
use serde::Deserialize;
use std::sync::Arc;

/// Serializable appender configuration.
///
/// ```json
/// {
///   "connection_string": "mongodb://127.0.0.1:27017/app",
///   "collection_name": "logs",
///   "fields": [
///     { "name": "timestamp", "formatter": { "kind": "timestamp" } },
///     { "name": "level", "formatter": { "kind": "level" } },
///     { "name": "line", "formatter": { "kind": "pattern", "pattern": "[%thread] %message" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppenderConfig {
    pub connection_string: Option<String>,
    pub connection_string_name: Option<String>,
    pub collection_name: Option<String>,
    pub fields: Vec<FieldConfig>,
}

/// One entry of the `fields` list. A missing formatter yields a field
/// that is never written.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub formatter: Option<FormatterConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatterConfig {
    Timestamp {
        #[serde(default)]
        format: Option<String>,
    },
    Level,
    Message,
    Thread,
    Logger,
    File,
    Line,
    Module,
    Property { name: String },
    Properties,
    Exception,
    Literal { value: serde_json::Value },
    Pattern { pattern: String },
}

impl FormatterConfig {
    pub fn build(&self) -> Result<Arc<dyn FieldFormatter>, ConfigError> {
        let formatter: Arc<dyn FieldFormatter> = match self {
            FormatterConfig::Timestamp { format: None } => Arc::new(Timestamp::native()),
            FormatterConfig::Timestamp { format: Some(fmt) } => Arc::new(Timestamp::parse(fmt)?),
            FormatterConfig::Level => Arc::new(LevelFormatter),
            FormatterConfig::Message => Arc::new(MessageFormatter),
            FormatterConfig::Thread => Arc::new(ThreadFormatter),
            FormatterConfig::Logger => Arc::new(TargetFormatter),
            FormatterConfig::File => Arc::new(Location::File),
            FormatterConfig::Line => Arc::new(Location::Line),
            FormatterConfig::Module => Arc::new(Location::ModulePath),
            FormatterConfig::Property { name } => Arc::new(Property::new(name.clone())),
            FormatterConfig::Properties => Arc::new(Properties),
            FormatterConfig::Exception => Arc::new(Exception),
            FormatterConfig::Literal { value } => Arc::new(Literal(json_to_bson(value.clone()))),
            FormatterConfig::Pattern { pattern } => Arc::new(Pattern::parse(pattern)?),
        };
        Ok(formatter)
    }
}

impl AppenderConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Connection settings from `LOG_SINK_*` variables; fields stay empty so
    /// activation falls back to the default mapping.
    pub fn from_env() -> Self {
        Self {
            connection_string: env_opt(LOG_SINK_CONNECTION_STRING_ENV),
            connection_string_name: env_opt(LOG_SINK_CONNECTION_STRING_NAME_ENV),
            collection_name: env_opt(LOG_SINK_COLLECTION_ENV),
            fields: Vec::new(),
        }
    }

    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            connection_string: self.connection_string.clone(),
            connection_string_name: self.connection_string_name.clone(),
            collection_name: self.collection_name.clone(),
        }
    }

    pub fn registry(&self) -> Result<FieldRegistry, ConfigError> {
        self.fields
            .iter()
            .map(|field| {
                Ok::<_, ConfigError>(FieldSpec {
                    name: field.name.clone(),
                    formatter: field.formatter.as_ref().map(FormatterConfig::build).transpose()?,
                })
            })
            .collect()
    }

    /// Build an appender with this configuration. It still has to be
    /// activated.
    pub fn into_appender(self, connector: Arc<dyn StoreConnector>) -> Result<MongoAppender, ConfigError> {
        let fields = self.registry()?;
        Ok(MongoAppender::new(self.settings(), connector).with_fields(fields))
    }
}
