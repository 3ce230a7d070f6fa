use std::error::Error;

/// Fatal problems found while activating an appender.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no connection string configured")]
    MissingConnectionString,

    #[error("malformed connection string: {0}")]
    Malformed(String),

    #[error("invalid conversion pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("failed to open store connection: {0}")]
    Connect(#[source] Box<dyn Error + Send + Sync>),
}

/// A single field formatter failed for one event.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("{0}")]
    Message(String),

    #[error("formatter panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] Box<dyn Error + Send + Sync>),
}

impl FormatError {
    pub fn msg(message: impl Into<String>) -> Self {
        FormatError::Message(message.into())
    }
}

/// The document store rejected or failed a write.
#[derive(thiserror::Error, Debug)]
#[error("document store write failed: {0}")]
pub struct PersistenceError(#[source] pub Box<dyn Error + Send + Sync>);

impl PersistenceError {
    pub fn new(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        PersistenceError(err.into())
    }
}

/// Error returned from event delivery on an appender.
#[derive(thiserror::Error, Debug)]
pub enum AppenderError {
    #[error("appender used before activation")]
    NotActivated,

    /// A write failed after `persisted` events of the call were stored.
    #[error("{source} ({persisted} event(s) persisted before the failure)")]
    Persistence {
        persisted: usize,
        #[source]
        source: PersistenceError,
    },
}

impl AppenderError {
    /// Events of the failed call that were stored anyway.
    pub fn persisted(&self) -> usize {
        match self {
            AppenderError::NotActivated => 0,
            AppenderError::Persistence { persisted, .. } => *persisted,
        }
    }
}
