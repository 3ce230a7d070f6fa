use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use tracing_mongo_sink::config::AppenderConfig;
use tracing_mongo_sink::env::{env_lookup, env_or, LOG_SINK_CONNECTION_STRING_ENV};
use tracing_mongo_sink::init::init_tracing;
use tracing_mongo_sink::mongo::MongoConnector;

/// Writes events to a local MongoDB.
///
/// Point `LOG_SINK_CONNECTION_STRING` at your instance, or set
/// `LOG_SINK_CONNECTION_STRING_NAME=primary` together with
/// `LOG_SINK_CONNECTION_PRIMARY=mongodb://...`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppenderConfig::from_env();
    if config.connection_string.is_none() {
        config.connection_string = Some(env_or(
            LOG_SINK_CONNECTION_STRING_ENV,
            "mongodb://127.0.0.1:27017/example",
        ));
    }

    let mut appender = config
        .into_appender(Arc::new(MongoConnector::with_app_name("mongodb-example")))?
        .with_lookup(env_lookup());
    appender.activate().await?;
    init_tracing(Arc::new(appender))?;

    info!("starting service");
    warn!(free_mb = 120, "disk space low");
    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    // Give the background task time to flush.
    sleep(Duration::from_secs(2)).await;
    Ok(())
}
