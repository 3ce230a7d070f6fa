use crate::connection::ConnectionTarget;
use crate::error::{ConfigError, PersistenceError};
use crate::store::{DocumentStore, StoreConnector};
use async_trait::async_trait;
use bson::Document;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::sync::Arc;

/// MongoDB implementation of [`DocumentStore`] writing to one collection.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub fn new(client: &Client, target: &ConnectionTarget) -> Self {
        let collection = client
            .database(&target.database)
            .collection::<Document>(&target.collection);
        Self { collection }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_one(&self, document: Document) -> Result<(), PersistenceError> {
        self.collection
            .insert_one(document, None)
            .await
            .map_err(PersistenceError::new)?;
        Ok(())
    }
}

/// Connector that builds a [`mongodb::Client`] from the resolved connection
/// string. The driver connects lazily, so activation only fails on options
/// the driver cannot parse.
#[derive(Clone, Default)]
pub struct MongoConnector {
    /// Overrides the driver's application name reported to the server.
    pub app_name: Option<String>,
}

impl MongoConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app_name(app_name: impl Into<String>) -> Self {
        Self {
            app_name: Some(app_name.into()),
        }
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(
        &self,
        connection_string: &str,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        let mut options = ClientOptions::parse(connection_string)
            .await
            .map_err(|e| ConfigError::Connect(Box::new(e)))?;
        if let Some(app_name) = &self.app_name {
            options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(options).map_err(|e| ConfigError::Connect(Box::new(e)))?;
        tracing::info!(
            endpoint = %target.endpoint,
            database = %target.database,
            collection = %target.collection,
            "opened mongodb collection"
        );
        Ok(Arc::new(MongoStore::new(&client, target)) as Arc<dyn DocumentStore>)
    }
}
