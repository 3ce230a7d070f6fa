use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use tracing_mongo_sink::appender::{ConnectionSettings, MongoAppender};
use tracing_mongo_sink::init::init_tracing;
use tracing_mongo_sink::memory::MemoryConnector;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let connector = MemoryConnector::default();
    let settings = ConnectionSettings {
        connection_string: Some("mongodb://127.0.0.1:27017/load".to_string()),
        ..Default::default()
    };
    let mut appender = MongoAppender::new(settings, Arc::new(connector.clone()));
    appender.activate().await?;
    init_tracing(Arc::new(appender))?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
    println!("documents stored: {}", connector.store().insert_calls());
    Ok(())
}
