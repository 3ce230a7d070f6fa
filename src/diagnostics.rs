use std::sync::{Arc, Mutex};

/// Fire-and-forget channel for faults the pipeline recovers from.
pub trait Diagnostics: Send + Sync {
    fn report(&self, fault: &str);
}

/// Writes every fault to standard error. Must not go through `tracing`,
/// which would feed the report back into the sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn report(&self, fault: &str) {
        eprintln!("tracing-mongo-sink: {}", fault);
    }
}

/// Keeps reported faults in memory so they can be inspected later.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    faults: Arc<Mutex<Vec<String>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<String> {
        self.faults.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn report(&self, fault: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(fault.to_string());
        }
    }
}
