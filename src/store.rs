use crate::connection::ConnectionTarget;
use crate::error::{ConfigError, PersistenceError};
use async_trait::async_trait;
use bson::Document;
use std::sync::Arc;

/// Handle to the collection documents are written to.
///
/// Implementations are responsible for transporting documents to a
/// concrete backend (MongoDB, an in-memory buffer, etc). The appender
/// calls `insert_one` once per event, in event order, and never retries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a single document.
    ///
    /// **Returns**
    /// - `Ok(())` if the document was accepted by the backend.
    /// - `Err(..)` if the backend failed (network error, rejected write,
    ///   etc.). The error is handed back to the caller unchanged.
    async fn insert_one(&self, document: Document) -> Result<(), PersistenceError>;
}

/// Opens a [`DocumentStore`] for a resolved target during activation.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// **Parameters**
    /// - `connection_string`: the resolved connection string, including
    ///   any driver options it carries.
    /// - `target`: database and collection to write to.
    async fn connect(
        &self,
        connection_string: &str,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn DocumentStore>, ConfigError>;
}
