//! Shared transport doubles for integration tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tls_probe::TransportError;
use tls_probe::transport::{ProbeReport, Transport};

pub fn report(version: &str) -> ProbeReport {
    ProbeReport {
        tls_version: Some(version.to_string()),
        rating: Some("probably okay".to_string()),
    }
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// Serves a scripted sequence of outcomes, optionally delaying each one,
/// and counts how often it was asked.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<ProbeReport, TransportError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<ProbeReport, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, _url: &str) -> Result<ProbeReport, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport exhausted")
    }
}
