use crate::connection::ConnectionTarget;
use crate::error::{ConfigError, PersistenceError};
use crate::store::{DocumentStore, StoreConnector};
use async_trait::async_trait;
use bson::Document;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A store that keeps every inserted document in memory.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// external I/O, and for tests that want to inspect what was written.
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    documents: Mutex<Vec<(ConnectionTarget, Document)>>,
    target: Mutex<Option<ConnectionTarget>>,
    inserts: AtomicUsize,
    fail_after: Mutex<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every insert after the first `n` successful ones.
    pub fn fail_after(&self, n: usize) {
        if let Ok(mut limit) = self.inner.fail_after.lock() {
            *limit = Some(n);
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        self.inner
            .documents
            .lock()
            .map(|docs| docs.iter().map(|(_, d)| d.clone()).collect())
            .unwrap_or_default()
    }

    /// Documents together with the target they were written to.
    pub fn entries(&self) -> Vec<(ConnectionTarget, Document)> {
        self.inner.documents.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Number of `insert_one` calls, failed ones included.
    pub fn insert_calls(&self) -> usize {
        self.inner.inserts.load(Ordering::Relaxed)
    }

    fn bind(&self, target: &ConnectionTarget) {
        if let Ok(mut current) = self.inner.target.lock() {
            *current = Some(target.clone());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, document: Document) -> Result<(), PersistenceError> {
        let call = self.inner.inserts.fetch_add(1, Ordering::Relaxed);
        let limit = self.inner.fail_after.lock().ok().and_then(|l| *l);
        if limit.is_some_and(|n| call >= n) {
            return Err(PersistenceError::new(format!("memory store rejected insert #{}", call + 1)));
        }

        let target = self
            .inner
            .target
            .lock()
            .ok()
            .and_then(|t| t.clone())
            .ok_or_else(|| PersistenceError::new("memory store is not bound to a target"))?;

        self.inner
            .documents
            .lock()
            .map_err(|_| PersistenceError::new("memory store lock poisoned"))?
            .push((target, document));
        Ok(())
    }
}

/// Connector handing out a shared [`MemoryStore`].
#[derive(Clone, Default)]
pub struct MemoryConnector {
    store: MemoryStore,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(
        &self,
        _connection_string: &str,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        self.store.bind(target);
        Ok(Arc::new(self.store.clone()) as Arc<dyn DocumentStore>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn target() -> ConnectionTarget {
        ConnectionTarget {
            endpoint: "localhost".into(),
            database: "log4net".into(),
            collection: "logs".into(),
        }
    }

    #[tokio::test]
    async fn records_documents_with_target() {
        let connector = MemoryConnector::default();
        let store = connector.connect("mem://localhost", &target()).await.unwrap();
        store.insert_one(doc! { "n": 1 }).await.unwrap();

        let entries = connector.store().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, target());
        assert_eq!(entries[0].1, doc! { "n": 1 });
    }

    #[tokio::test]
    async fn fails_after_limit() {
        let connector = MemoryConnector::default();
        connector.store().fail_after(1);
        let store = connector.connect("mem://localhost", &target()).await.unwrap();

        assert!(store.insert_one(doc! { "n": 1 }).await.is_ok());
        assert!(store.insert_one(doc! { "n": 2 }).await.is_err());
        assert_eq!(connector.store().insert_calls(), 2);
        assert_eq!(connector.store().documents().len(), 1);
    }

    #[tokio::test]
    async fn unbound_store_rejects_writes() {
        let store = MemoryStore::new();
        assert!(store.insert_one(doc! {}).await.is_err());
    }
}
