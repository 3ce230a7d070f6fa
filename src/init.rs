use crate::appender::MongoAppender;
use crate::diagnostics::{Diagnostics, StderrDiagnostics};
use crate::layer::DocumentLayer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Layer configuration.
///
/// **Fields**
/// - `channel_buffer`: maximum number of [`LogEvent`](crate::event::LogEvent)s
///   queued before new events are dropped.
/// - `batch_size`: number of events handed to the appender per flush.
/// - `flush_interval`: maximum time between flushes, even for a partial
///   batch.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top so events are also printed to the console.
/// - `min_level`: least severe level that is persisted.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub min_level: Level,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
            min_level: Level::INFO,
        }
    }
}

/// Install a global `tracing` subscriber that persists events through an
/// activated [`MongoAppender`].
///
/// **Parameters**
/// - `appender`: appender that has already been activated.
/// - `config`: [`LayerConfig`] controlling buffering and batching.
/// - `diagnostics`: where failed flushes are reported.
///
/// **Returns**
/// - the handle of the background flush task, or an error if a global
///   subscriber was already installed.
pub fn init_tracing_with_config(
    appender: Arc<MongoAppender>,
    config: LayerConfig,
    diagnostics: Arc<dyn Diagnostics>,
) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    let (layer, handle) = DocumentLayer::new(
        appender,
        diagnostics,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
        config.min_level,
    );

    // The two subscriber shapes have different types, so install each
    // branch separately.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`] and [`StderrDiagnostics`]. This is the
/// recommended entrypoint for typical microservices.
pub fn init_tracing(appender: Arc<MongoAppender>) -> Result<JoinHandle<()>, SetGlobalDefaultError> {
    init_tracing_with_config(appender, LayerConfig::default(), Arc::new(StderrDiagnostics))
}
