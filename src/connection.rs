use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Arc;

/// Database used when the connection string does not name one.
pub const DEFAULT_DATABASE: &str = "log4net";

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "logs";

/// Named connection-string lookup, e.g. backed by a config file or the
/// environment.
pub type ConnectionLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where documents are written. Resolved once per activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub endpoint: String,
    pub database: String,
    pub collection: String,
}

/// Pieces of a connection string relevant to target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConnection {
    pub scheme: String,
    /// Host list with any credentials removed, e.g. `h1:27017,h2:27017`.
    pub endpoint: String,
    pub database: Option<String>,
}

/// Lookup that never finds anything.
pub fn no_lookup() -> ConnectionLookup {
    Arc::new(|_| None)
}

/// Lookup over a fixed set of named connection strings.
pub fn map_lookup(entries: HashMap<String, String>) -> ConnectionLookup {
    Arc::new(move |name| entries.get(name).cloned())
}

/// Pick the connection string to use.
///
/// A configured `name` that resolves through `lookup` wins over
/// `explicit`. A name that does not resolve falls back to `explicit`
/// without an error.
pub fn resolve_connection_string(
    explicit: Option<&str>,
    name: Option<&str>,
    lookup: &(dyn Fn(&str) -> Option<String> + Send + Sync),
) -> Result<String, ConfigError> {
    if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
        match lookup(name).filter(|found| !found.trim().is_empty()) {
            Some(found) => return Ok(found),
            None => tracing::debug!(name, "named connection string not found, using explicit connection string"),
        }
    }

    explicit
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingConnectionString)
}

/// Split `scheme://[user[:pass]@]hosts[/database][?options]`.
pub fn parse_connection_string(conn: &str) -> Result<ParsedConnection, ConfigError> {
    let malformed = |reason: &str| ConfigError::Malformed(format!("{}: {}", reason, redact(conn)));

    let (scheme, rest) = conn
        .split_once("://")
        .ok_or_else(|| malformed("missing scheme separator"))?;
    if scheme.is_empty() {
        return Err(malformed("empty scheme"));
    }

    let rest = rest.split_once('?').map_or(rest, |(before, _)| before);
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let hosts = authority.rsplit_once('@').map_or(authority, |(_, hosts)| hosts);

    if hosts.is_empty() || hosts.split(',').any(str::is_empty) {
        return Err(malformed("empty host"));
    }

    let db = path.split('/').next().unwrap_or_default();
    let database = if db.is_empty() {
        None
    } else {
        let decoded = urlencoding::decode(db).map_err(|_| malformed("database name is not valid UTF-8"))?;
        Some(decoded.into_owned())
    };

    Ok(ParsedConnection {
        scheme: scheme.to_ascii_lowercase(),
        endpoint: hosts.to_string(),
        database,
    })
}

/// Resolve the write target from a connection string and an optional
/// collection override.
pub fn resolve_target(conn: &str, collection: Option<&str>) -> Result<ConnectionTarget, ConfigError> {
    let parsed = parse_connection_string(conn)?;
    let collection = collection
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_COLLECTION);

    Ok(ConnectionTarget {
        endpoint: parsed.endpoint,
        database: parsed.database.unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        collection: collection.to_string(),
    })
}

/// Connection string with the password blanked out, for error messages.
pub fn redact(conn: &str) -> String {
    let Some((scheme, rest)) = conn.split_once("://") else {
        return conn.to_string();
    };
    let end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(end);
    match authority.rsplit_once('@') {
        Some((creds, hosts)) => {
            let user = creds.split_once(':').map_or(creds, |(user, _)| user);
            format!("{}://{}:***@{}{}", scheme, user, hosts, tail)
        }
        None => conn.to_string(),
    }
}
