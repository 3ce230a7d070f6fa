use crate::connection::{self, ConnectionLookup, ConnectionTarget};
use crate::diagnostics::{Diagnostics, StderrDiagnostics};
use crate::document::build_document;
use crate::error::{AppenderError, ConfigError, PersistenceError};
use crate::event::LogEvent;
use crate::registry::{FieldRegistry, FieldSpec};
use crate::store::{DocumentStore, StoreConnector};
use std::sync::Arc;

/// Connection settings read at activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub connection_string: Option<String>,
    /// Looked up through the appender's [`ConnectionLookup`]; takes
    /// precedence over `connection_string` when found.
    pub connection_string_name: Option<String>,
    pub collection_name: Option<String>,
}

struct Active {
    target: ConnectionTarget,
    store: Arc<dyn DocumentStore>,
}

/// Turns log events into documents and writes them, one insert per event,
/// to the collection resolved at activation.
///
/// Fields are registered before [`MongoAppender::activate`]. Delivery
/// methods take `&self` and may be called through an `Arc`; callers are
/// expected to serialize them.
pub struct MongoAppender {
    settings: ConnectionSettings,
    fields: FieldRegistry,
    connector: Arc<dyn StoreConnector>,
    lookup: ConnectionLookup,
    diagnostics: Arc<dyn Diagnostics>,
    active: Option<Active>,
}

impl MongoAppender {
    pub fn new(settings: ConnectionSettings, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            settings,
            fields: FieldRegistry::new(),
            connector,
            lookup: connection::no_lookup(),
            diagnostics: Arc::new(StderrDiagnostics),
            active: None,
        }
    }

    pub fn with_lookup(mut self, lookup: ConnectionLookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_fields(mut self, fields: FieldRegistry) -> Self {
        self.fields = fields;
        self
    }

    pub fn register(&mut self, spec: FieldSpec) {
        self.fields.register(spec);
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Replace the connection settings. Takes effect on the next
    /// [`MongoAppender::activate`]; the current target stays in use until then.
    pub fn set_settings(&mut self, settings: ConnectionSettings) {
        self.settings = settings;
    }

    /// Resolve the target and open the store.
    ///
    /// On failure the previous state is kept, so a never-activated
    /// appender stays unusable. An empty registry is replaced with
    /// [`FieldRegistry::with_defaults`].
    pub async fn activate(&mut self) -> Result<(), ConfigError> {
        let conn = connection::resolve_connection_string(
            self.settings.connection_string.as_deref(),
            self.settings.connection_string_name.as_deref(),
            self.lookup.as_ref(),
        )?;
        let target = connection::resolve_target(&conn, self.settings.collection_name.as_deref())?;
        let store = self.connector.connect(&conn, &target).await?;

        if self.fields.is_empty() {
            self.fields = FieldRegistry::with_defaults();
        }

        tracing::info!(
            endpoint = %target.endpoint,
            database = %target.database,
            collection = %target.collection,
            fields = self.fields.len(),
            "appender activated"
        );
        self.active = Some(Active { target, store });
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn target(&self) -> Option<&ConnectionTarget> {
        self.active.as_ref().map(|a| &a.target)
    }

    /// Build and persist the document for a single event.
    pub async fn on_event(&self, event: &LogEvent) -> Result<(), AppenderError> {
        let active = self.active.as_ref().ok_or(AppenderError::NotActivated)?;
        self.persist(active, event)
            .await
            .map_err(|source| AppenderError::Persistence { persisted: 0, source })
    }

    /// Persist a batch, one insert per event in batch order. The first
    /// failed insert stops the batch; the error carries how many events
    /// were stored before it. Stored events are not rolled back.
    pub async fn on_flush(&self, events: &[LogEvent]) -> Result<(), AppenderError> {
        let active = self.active.as_ref().ok_or(AppenderError::NotActivated)?;
        for (persisted, event) in events.iter().enumerate() {
            self.persist(active, event)
                .await
                .map_err(|source| AppenderError::Persistence { persisted, source })?;
        }
        tracing::debug!(count = events.len(), "flushed log events");
        Ok(())
    }

    async fn persist(&self, active: &Active, event: &LogEvent) -> Result<(), PersistenceError> {
        let document = build_document(event, self.fields.list(), self.diagnostics.as_ref());
        active.store.insert_one(document).await
    }
}
