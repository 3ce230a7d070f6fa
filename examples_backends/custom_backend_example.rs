use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use tokio::time::{sleep, Duration};
use tracing::{error, info};
use tracing_mongo_sink::{
    appender::{ConnectionSettings, MongoAppender},
    connection::ConnectionTarget,
    error::{ConfigError, PersistenceError},
    init::init_tracing,
    store::{DocumentStore, StoreConnector},
};

/// Example of integrating a completely custom document store by
/// implementing the store traits directly. Imagine this talks to some
/// proprietary DB for which this crate does not provide a built-in
/// client.
struct PrintStore {
    target: ConnectionTarget,
}

#[async_trait]
impl DocumentStore for PrintStore {
    async fn insert_one(&self, document: Document) -> Result<(), PersistenceError> {
        // Here you would call your own client library for the target DB.
        // For the sake of example we just print the document.
        println!("[{}.{}] {}", self.target.database, self.target.collection, document);
        Ok(())
    }
}

struct PrintConnector;

#[async_trait]
impl StoreConnector for PrintConnector {
    async fn connect(
        &self,
        _connection_string: &str,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        Ok(Arc::new(PrintStore { target: target.clone() }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = ConnectionSettings {
        connection_string: Some("print://console/demo".to_string()),
        ..Default::default()
    };
    let mut appender = MongoAppender::new(settings, Arc::new(PrintConnector));
    appender.activate().await?;
    init_tracing(Arc::new(appender))?;

    info!("custom backend example started");
    error!(db = "my-custom-db", "simulated error sent via custom backend");

    sleep(Duration::from_secs(2)).await;
    Ok(())
}
