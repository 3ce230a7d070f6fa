use crate::appender::MongoAppender;
use crate::diagnostics::Diagnostics;
use crate::event::{current_thread_name, ErrorInfo, LogEvent};
use chrono::Utc;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never captured: this crate's own logs and the
/// MongoDB driver's, either of which would otherwise loop back into the
/// store.
pub const IGNORED_TARGETS: &[&str] = &["tracing_mongo_sink", "mongodb"];

/// Counters shared between the layer and its background task.
#[derive(Debug, Default)]
pub struct LayerStats {
    /// Total events seen by the layer (before filtering by level).
    pub total_events: AtomicU64,
    /// Successfully enqueued into channel.
    pub enqueued_events: AtomicU64,
    /// Dropped because the channel was full.
    pub dropped_events: AtomicU64,
    /// Stored by the appender, including the head of a batch that failed
    /// part way.
    pub persisted_events: AtomicU64,
    /// Dropped from a failed flush: the failing event and everything after it.
    pub failed_events: AtomicU64,
}

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and
/// hands them to a [`MongoAppender`] in batches.
///
/// Events at or above `min_level` in severity are queued on a bounded
/// channel; a background task drains it and calls
/// [`MongoAppender::on_flush`] whenever `batch_size` events are buffered
/// or `flush_interval` elapses. A failed flush is reported to the
/// diagnostics sink and the rest of the batch is dropped.
pub struct DocumentLayer {
    sender: mpsc::Sender<LogEvent>,
    min_level: Level,
    stats: Arc<LayerStats>,
}

impl DocumentLayer {
    /// Create a new layer and spawn the background flush task.
    ///
    /// Must be called inside a Tokio runtime. Minimal thresholds are
    /// enforced for `buffer`, `batch_size` and `flush_interval`. The task
    /// flushes what is left and exits once the layer is dropped.
    pub fn new(
        appender: Arc<MongoAppender>,
        diagnostics: Arc<dyn Diagnostics>,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
        min_level: Level,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<LogEvent>(buffer);
        let stats = Arc::new(LayerStats::default());
        let stats_bg = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let mut ticker = interval_at(Instant::now() + flush_interval, flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(event) => {
                            batch.push(event);
                            if batch.len() >= batch_size {
                                flush_batch(&appender, diagnostics.as_ref(), &stats_bg, &mut batch).await;
                            }
                        }
                        None => {
                            flush_batch(&appender, diagnostics.as_ref(), &stats_bg, &mut batch).await;
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        flush_batch(&appender, diagnostics.as_ref(), &stats_bg, &mut batch).await;
                    }
                }
            }
        });

        (
            Self {
                sender: tx,
                min_level,
                stats,
            },
            handle,
        )
    }

    pub fn stats(&self) -> Arc<LayerStats> {
        Arc::clone(&self.stats)
    }
}

async fn flush_batch(
    appender: &MongoAppender,
    diagnostics: &dyn Diagnostics,
    stats: &LayerStats,
    batch: &mut Vec<LogEvent>,
) {
    if batch.is_empty() {
        return;
    }

    let count = batch.len() as u64;
    match appender.on_flush(batch.as_slice()).await {
        Ok(()) => {
            stats.persisted_events.fetch_add(count, Ordering::Relaxed);
        }
        Err(e) => {
            let persisted = (e.persisted() as u64).min(count);
            let dropped = count - persisted;
            stats.persisted_events.fetch_add(persisted, Ordering::Relaxed);
            stats.failed_events.fetch_add(dropped, Ordering::Relaxed);
            diagnostics.report(&format!("dropping {} of {} log events: {}", dropped, count, e));
        }
    }
    batch.clear();
}

fn is_ignored(target: &str) -> bool {
    IGNORED_TARGETS
        .iter()
        .any(|prefix| target == *prefix || target.strip_prefix(prefix).is_some_and(|rest| rest.starts_with("::")))
}

impl<S> Layer<S> for DocumentLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.stats.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || is_ignored(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut error: Option<ErrorInfo> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            error: &mut error,
        };
        event.record(&mut visitor);

        let record = LogEvent {
            timestamp: Utc::now(),
            level: *meta.level(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            thread: current_thread_name(),
            fields,
            message,
            error,
        };

        match self.sender.try_send(record) {
            Ok(()) => {
                self.stats.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.stats.dropped_events.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Collects event fields; `message` goes to the message slot and the first
/// recorded error becomes the event's error.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
    pub error: &'a mut Option<ErrorInfo>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let info = ErrorInfo::from_error(value);
        self.fields.insert(field.name().to_string(), serde_json::Value::String(info.message.clone()));
        if self.error.is_none() {
            *self.error = Some(info);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_own_and_driver_targets() {
        assert!(is_ignored("tracing_mongo_sink"));
        assert!(is_ignored("tracing_mongo_sink::appender"));
        assert!(is_ignored("mongodb::connection"));
        assert!(!is_ignored("mongodb_app"));
        assert!(!is_ignored("billing::api"));
    }
}
