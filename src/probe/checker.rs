//! Check orchestration

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::config::{self, APPROVED_TLS_VERSIONS, ProbeConfig};
use crate::probe::error::{CheckError, TransportError};
use crate::probe::evaluator::is_tls_compatible;
use crate::probe::store::VerdictStore;
use crate::probe::verdict::{StoredVerdict, Verdict};
use crate::transport::{DirectTransport, JsonpTransport, Transport, TransportChoice};

/// Check orchestrator: owns the verdict, the sticky error, the running
/// flag, and the TTL, and coordinates the transport, the evaluator, and
/// the store behind one check/re-check API.
///
/// At most one remote check is in flight at a time. Callers arriving
/// while one is outstanding are rejected with
/// [`CheckError::AlreadyRunning`] rather than queued onto the in-flight
/// call; they must ask again after it settles. Every call resolves on a
/// later poll, whichever path answers it, so no caller can observe a
/// synchronous completion.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct TlsChecker {
    inner: Arc<CheckerInner>,
}

struct CheckerInner {
    state: Mutex<CheckState>,
    transport: Arc<dyn Transport>,
    store: VerdictStore,
    endpoint: String,
}

struct CheckState {
    verdict: Verdict,
    error: Option<CheckError>,
    running: bool,
    ttl_ms: i64,
    /// Bumped by every re-check. A completion carrying an older value is
    /// superseded and must not touch shared state.
    cycle: u64,
}

/// Outcome of the synchronous gate section of a check: either the call
/// is answerable from state, or it started the probe that will answer it.
enum Gate {
    Done(Result<bool, CheckError>),
    Probe {
        cycle: u64,
        task: JoinHandle<Result<bool, CheckError>>,
    },
}

impl TlsChecker {
    /// Default wiring: transport built from `config.transport`, store
    /// opened at `config.db_path` or under the data directory.
    pub fn new(config: &ProbeConfig) -> Self {
        let transport: Arc<dyn Transport> = match config.transport {
            TransportChoice::Direct => Arc::new(DirectTransport::new()),
            TransportChoice::Jsonp => Arc::new(JsonpTransport::new()),
        };

        let store = match &config.db_path {
            Some(path) => VerdictStore::open(path),
            None => default_store(),
        };

        Self::build(config, transport, store)
    }

    /// Wires a checker from explicit collaborators; the dependency
    /// injection counterpart of [`TlsChecker::new`].
    pub fn build(config: &ProbeConfig, transport: Arc<dyn Transport>, store: VerdictStore) -> Self {
        let verdict = if config.maybe_incompatible == Some(true) {
            info!("Environment hints incompatibility; seeding a negative verdict");
            Verdict::Incompatible
        } else {
            Verdict::Unknown
        };

        Self {
            inner: Arc::new(CheckerInner {
                state: Mutex::new(CheckState {
                    verdict,
                    error: None,
                    running: false,
                    ttl_ms: config.ttl_ms,
                    cycle: 0,
                }),
                transport,
                store,
                endpoint: config.endpoint.clone(),
            }),
        }
    }

    /// Requests the current compatibility verdict.
    ///
    /// Resolution order: the sticky error, then the in-memory verdict,
    /// then a fresh persisted record (adopted and renewed), then the
    /// network. Only the last path touches the transport, and only when
    /// no other call already has one outstanding.
    pub async fn check(&self) -> Result<bool, CheckError> {
        let gate = self.begin_check();

        // Whichever path answered, callers never see a first-poll
        // completion.
        tokio::task::yield_now().await;

        match gate {
            Gate::Done(outcome) => outcome,
            Gate::Probe { cycle, task } => match task.await {
                Ok(outcome) => outcome,
                Err(e) => self.inner.settle_dead_probe(cycle, &e),
            },
        }
    }

    /// Clears the sticky error and the in-memory verdict, then runs a
    /// regular check.
    ///
    /// The persisted record is not erased, so a still-fresh record will
    /// satisfy the re-check without a network call. An outstanding
    /// transport call is not stopped either; its eventual completion is
    /// discarded as superseded.
    pub async fn re_check(&self) -> Result<bool, CheckError> {
        {
            let mut state = self.inner.lock_state();
            state.error = None;
            state.verdict = Verdict::Unknown;
            state.cycle += 1;
        }

        self.check().await
    }

    /// Whether a transport call is currently outstanding. Pure read.
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running
    }

    /// Overwrites the TTL used for later freshness evaluations. An
    /// already adopted in-memory verdict is not revisited.
    pub fn set_ttl(&self, ttl_ms: i64) {
        self.inner.lock_state().ttl_ms = ttl_ms;
    }

    /// One-shot entry point, as the command line runs it: builds a
    /// checker from `config` and resolves a single verdict.
    ///
    /// With `fresh` set the TTL drops to zero for this run, so a record
    /// persisted by an earlier run cannot answer and the endpoint is
    /// asked again; the new observation is persisted as usual.
    pub async fn run_once(config: &ProbeConfig, fresh: bool) -> Result<bool, CheckError> {
        let checker = Self::new(config);
        if fresh {
            checker.set_ttl(0);
            checker.re_check().await
        } else {
            checker.check().await
        }
    }

    /// The synchronous first-poll section: decides the path for this
    /// call and, when the network is needed, marks the flight and spawns
    /// the probe before anything yields.
    fn begin_check(&self) -> Gate {
        let mut state = self.inner.lock_state();

        if let Some(error) = state.error.clone() {
            return Gate::Done(Err(error));
        }

        if state.verdict == Verdict::Unknown {
            self.inner.adopt_stored_verdict(&mut state);
        }

        if let Some(compatible) = state.verdict.as_bool() {
            return Gate::Done(Ok(compatible));
        }

        if state.running {
            return Gate::Done(Err(CheckError::AlreadyRunning));
        }

        state.running = true;
        let cycle = state.cycle;
        drop(state);

        debug!("Starting remote compatibility check (cycle {})", cycle);

        // The probe runs detached so a caller dropping its future can
        // neither cancel the request nor leave the flight marked forever.
        let inner = Arc::clone(&self.inner);
        Gate::Probe {
            cycle,
            task: tokio::spawn(async move { inner.run_probe(cycle).await }),
        }
    }
}

impl CheckerInner {
    fn lock_state(&self) -> MutexGuard<'_, CheckState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adopts a still-fresh persisted record into memory and re-persists
    /// it with the current timestamp, so the window slides on every read.
    fn adopt_stored_verdict(&self, state: &mut CheckState) {
        let Some(record) = self.store.load() else {
            return;
        };

        let now = now_ms();
        if !record.is_fresh(state.ttl_ms, now) {
            debug!("Persisted verdict expired; the network will be asked again");
            return;
        }

        state.verdict = Verdict::from_compatible(record.compatible);
        self.store.save(&StoredVerdict {
            compatible: record.compatible,
            observed_at_ms: now,
        });
        debug!("Adopted persisted verdict: {:?}", state.verdict);
    }

    /// Runs the transport once and settles the cycle it belongs to.
    /// Returns the outcome so the caller that started the cycle can
    /// resolve with it.
    async fn run_probe(&self, cycle: u64) -> Result<bool, CheckError> {
        let fetched = AssertUnwindSafe(self.transport.fetch(&self.endpoint))
            .catch_unwind()
            .await;

        let outcome = match fetched {
            Ok(Ok(report)) => {
                let compatible = is_tls_compatible(&report, APPROVED_TLS_VERSIONS);
                info!(
                    "Compatibility check settled: tls_version={:?} rating={:?} compatible={}",
                    report.tls_version, report.rating, compatible
                );
                Ok(compatible)
            }
            Ok(Err(e)) => {
                warn!("Compatibility check failed: {}", e);
                Err(CheckError::Transport(e))
            }
            Err(panic) => {
                let detail = panic_detail(panic.as_ref());
                warn!("Transport panicked: {}", detail);
                Err(CheckError::Transport(TransportError::Aborted(detail)))
            }
        };

        self.settle(cycle, &outcome);
        outcome
    }

    /// Settles on behalf of a probe task that died before it could settle
    /// itself, such as a panic outside the transport guard. The flight
    /// still ends and the failure still sticks.
    fn settle_dead_probe(&self, cycle: u64, error: &JoinError) -> Result<bool, CheckError> {
        warn!("Check task died before settling: {}", error);
        let outcome = Err(CheckError::Transport(TransportError::Aborted(
            error.to_string(),
        )));
        self.settle(cycle, &outcome);
        outcome
    }

    /// Applies a completed cycle's outcome to shared state.
    fn settle(&self, cycle: u64, outcome: &Result<bool, CheckError>) {
        let mut state = self.lock_state();

        // This completion belongs to the only transport call that can be
        // outstanding, so the flight is over either way.
        state.running = false;

        if state.cycle != cycle {
            warn!(
                "Discarding completion of superseded check cycle {} (current cycle {})",
                cycle, state.cycle
            );
            return;
        }

        match outcome {
            Ok(compatible) => {
                state.verdict = Verdict::from_compatible(*compatible);
                self.store.save(&StoredVerdict {
                    compatible: *compatible,
                    observed_at_ms: now_ms(),
                });
            }
            Err(error) => {
                state.error = Some(error.clone());
            }
        }
    }
}

fn default_store() -> VerdictStore {
    let data_dir = config::data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        error!("Failed to create data directory {:?}: {}", data_dir, e);
        return VerdictStore::unavailable();
    }

    VerdictStore::open(&config::db_path())
}

/// Current time in milliseconds since the UNIX epoch
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as i64
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
