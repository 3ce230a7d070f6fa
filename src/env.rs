//! Environment variable names used by this crate for convenient
//! configuration of the appender from microservices.
//!
//! These are purely helpers; the appender itself never reads the
//! environment.

use crate::connection::ConnectionLookup;
use std::sync::Arc;

/// Direct connection string, e.g. `mongodb://127.0.0.1:27017/logs`.
pub const LOG_SINK_CONNECTION_STRING_ENV: &str = "LOG_SINK_CONNECTION_STRING";

/// Name of a connection string to resolve through [`env_lookup`].
pub const LOG_SINK_CONNECTION_STRING_NAME_ENV: &str = "LOG_SINK_CONNECTION_STRING_NAME";

/// Target collection name.
pub const LOG_SINK_COLLECTION_ENV: &str = "LOG_SINK_COLLECTION";

/// Prefix of named connection strings: `LOG_SINK_CONNECTION_<NAME>`.
pub const LOG_SINK_CONNECTION_PREFIX: &str = "LOG_SINK_CONNECTION_";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and empty alike.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Environment key holding the connection string registered as `name`.
///
/// The name is upper-cased and every non-alphanumeric character becomes
/// `_`, so `Logging.Primary` maps to `LOG_SINK_CONNECTION_LOGGING_PRIMARY`.
pub fn named_connection_key(name: &str) -> String {
    let suffix: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{}{}", LOG_SINK_CONNECTION_PREFIX, suffix)
}

/// Named connection-string lookup backed by the process environment.
pub fn env_lookup() -> ConnectionLookup {
    Arc::new(|name| env_opt(&named_connection_key(name)))
}
