use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{error, Level};

use tracing_mongo_sink::appender::{ConnectionSettings, MongoAppender};
use tracing_mongo_sink::diagnostics::StderrDiagnostics;
use tracing_mongo_sink::formatter::{LevelFormatter, Property, Timestamp};
use tracing_mongo_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_mongo_sink::memory::MemoryConnector;
use tracing_mongo_sink::pattern::Pattern;
use tracing_mongo_sink::registry::FieldSpec;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let connector = MemoryConnector::default();
    let settings = ConnectionSettings {
        connection_string: Some("mongodb://127.0.0.1:27017/load".to_string()),
        collection_name: Some("custom_load".to_string()),
        ..Default::default()
    };
    let mut appender = MongoAppender::new(settings, Arc::new(connector.clone()));
    appender.register(FieldSpec::new("ts", Timestamp::native()));
    appender.register(FieldSpec::new("level", LevelFormatter));
    appender.register(FieldSpec::new("iteration", Property::new("iteration")));
    appender.register(FieldSpec::new("line", Pattern::parse("[%thread] %message")?));
    appender.activate().await?;

    let layer_config = LayerConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        enable_stdout: false,
        min_level: Level::ERROR,
    };

    init_tracing_with_config(Arc::new(appender), layer_config, Arc::new(StderrDiagnostics))?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    sleep(Duration::from_secs(2)).await;
    println!("documents stored: {}", connector.store().insert_calls());
    Ok(())
}
