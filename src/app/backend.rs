// corpusboard - app/backend.rs
//
// Collection backend seam and the simulated backend used by the dashboard.
//
// A backend is told to start or stop collecting for a named collector and
// reports back over an mpsc channel it is handed at start time. The
// dashboard drains that channel on its own thread and applies the events to
// the store, so backends never see the store.
//
// SimulatedBackend runs one background thread per active collection. It
// "connects" after a short delay, reports progress on a fixed tick and
// completes at 100 %. The loop sleeps in cancel-check slices so
// `stop_collection` takes effect within CANCEL_CHECK_INTERVAL_MS.

use crate::app::scheduler::sleep_cancellable;
use crate::util::constants::{
    COLLECTOR_CONNECT_PROGRESS, DEFAULT_COLLECTOR_CONNECT_DELAY_MS, DEFAULT_COLLECTOR_STEP,
    DEFAULT_COLLECTOR_TICK_MS, DEFAULT_SIMULATED_DOCUMENTS, MAX_PROGRESS,
};
use crate::util::error::CollectionError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// =============================================================================
// Public types
// =============================================================================

/// Parameters for one collection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionConfig {
    /// How far back the source is searched, in days.
    pub date_range_days: u32,

    /// Upper bound on documents fetched in this run.
    pub max_documents: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            date_range_days: 30,
            max_documents: DEFAULT_SIMULATED_DOCUMENTS,
        }
    }
}

/// Reported by a backend while a collection runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    /// Progress in percent. Backends report monotonically.
    Progress { collector: String, percent: u8 },

    /// The run finished normally.
    Completed {
        collector: String,
        documents_added: u64,
    },

    /// The run failed; the collector should move to `error`.
    Failed { collector: String, reason: String },
}

impl CollectionEvent {
    /// Name of the collector this event is about.
    pub fn collector(&self) -> &str {
        match self {
            CollectionEvent::Progress { collector, .. }
            | CollectionEvent::Completed { collector, .. }
            | CollectionEvent::Failed { collector, .. } => collector,
        }
    }
}

/// Something that can collect documents on behalf of a named collector.
pub trait CollectionBackend {
    /// Begin collecting. Events for this run go to `events` until the run
    /// completes, fails or is stopped.
    fn start_collection(
        &mut self,
        collector: &str,
        config: &CollectionConfig,
        events: mpsc::Sender<CollectionEvent>,
    ) -> Result<(), CollectionError>;

    /// Stop a run. Unknown or finished collectors are ignored.
    fn stop_collection(&mut self, collector: &str);

    /// Stop every run. Called once when the dashboard shuts down.
    fn shutdown(&mut self) {}
}

// =============================================================================
// SimulatedBackend
// =============================================================================

/// Pacing of simulated collection runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorTiming {
    pub connect_delay: Duration,
    pub tick: Duration,
    pub step: u8,
}

impl Default for CollectorTiming {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(DEFAULT_COLLECTOR_CONNECT_DELAY_MS),
            tick: Duration::from_millis(DEFAULT_COLLECTOR_TICK_MS),
            step: DEFAULT_COLLECTOR_STEP,
        }
    }
}

struct Run {
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

/// Demo backend: fakes progress on background threads.
pub struct SimulatedBackend {
    timing: CollectorTiming,
    runs: HashMap<String, Run>,

    /// Collectors whose runs fail right after connecting.
    failing: HashSet<String>,
}

impl SimulatedBackend {
    pub fn new(timing: CollectorTiming) -> Self {
        Self {
            timing,
            runs: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// Make every future run of `collector` fail after connecting.
    pub fn fail_on(mut self, collector: impl Into<String>) -> Self {
        self.failing.insert(collector.into());
        self
    }

    /// True while a run for `collector` is in flight.
    pub fn is_collecting(&self, collector: &str) -> bool {
        self.runs
            .get(collector)
            .is_some_and(|run| !run.finished.load(Ordering::SeqCst))
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(CollectorTiming::default())
    }
}

impl CollectionBackend for SimulatedBackend {
    fn start_collection(
        &mut self,
        collector: &str,
        config: &CollectionConfig,
        events: mpsc::Sender<CollectionEvent>,
    ) -> Result<(), CollectionError> {
        if self.is_collecting(collector) {
            return Err(CollectionError::AlreadyRunning {
                collector: collector.to_string(),
            });
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        self.runs.insert(
            collector.to_string(),
            Run {
                cancel: Arc::clone(&cancel),
                finished: Arc::clone(&finished),
            },
        );

        let job = SimulatedRun {
            collector: collector.to_string(),
            timing: self.timing.clone(),
            documents: config.max_documents,
            fail: self.failing.contains(collector),
        };
        std::thread::spawn(move || {
            job.run(&events, &cancel);
            finished.store(true, Ordering::SeqCst);
        });

        tracing::info!(
            collector,
            date_range_days = config.date_range_days,
            max_documents = config.max_documents,
            "Simulated collection started"
        );
        Ok(())
    }

    fn stop_collection(&mut self, collector: &str) {
        if let Some(run) = self.runs.remove(collector) {
            run.cancel.store(true, Ordering::SeqCst);
            tracing::info!(collector, "Simulated collection stopped");
        }
    }

    fn shutdown(&mut self) {
        for (_, run) in self.runs.drain() {
            run.cancel.store(true, Ordering::SeqCst);
        }
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything the background thread needs for one run.
struct SimulatedRun {
    collector: String,
    timing: CollectorTiming,
    documents: u64,
    fail: bool,
}

impl SimulatedRun {
    fn run(self, events: &mpsc::Sender<CollectionEvent>, cancel: &AtomicBool) {
        macro_rules! send {
            ($event:expr) => {
                if cancel.load(Ordering::SeqCst) || events.send($event).is_err() {
                    return;
                }
            };
        }

        if sleep_cancellable(self.timing.connect_delay, cancel) {
            return;
        }

        if self.fail {
            tracing::warn!(collector = %self.collector, "Simulated source refused connection");
            send!(CollectionEvent::Failed {
                collector: self.collector.clone(),
                reason: "source refused connection".to_string(),
            });
            return;
        }

        let mut percent = COLLECTOR_CONNECT_PROGRESS;
        send!(CollectionEvent::Progress {
            collector: self.collector.clone(),
            percent,
        });

        let step = self.timing.step.max(1);
        while percent < MAX_PROGRESS {
            if sleep_cancellable(self.timing.tick, cancel) {
                return;
            }
            percent = percent.saturating_add(step).min(MAX_PROGRESS);
            send!(CollectionEvent::Progress {
                collector: self.collector.clone(),
                percent,
            });
        }

        send!(CollectionEvent::Completed {
            collector: self.collector.clone(),
            documents_added: self.documents,
        });
    }
}
