// corpusboard - app/dashboard.rs
//
// Dashboard controller: turns user actions into store mutations and
// scheduled work, and pumps finished work back into the store.
//
// Architecture:
//   - The dashboard owns the ViewStateStore, a Scheduler for timed demo work
//     and a CollectionBackend. All three live on the caller's thread.
//   - Scheduled tasks and backend threads only send events. `pump` drains
//     the scheduler channel and every run's channel and applies the events,
//     so the store has one writer.
//   - Each collection run gets its own channel. Stopping a run drops its
//     receiver, so nothing it sent can reach a later run of the same
//     collector.
//   - User-facing outcomes are queued as `Notice`s for the presentation
//     layer to show (and drain with `take_notices`).

use crate::app::backend::{
    CollectionBackend, CollectionConfig, CollectionEvent, CollectorTiming, SimulatedBackend,
};
use crate::app::scheduler::{Scheduler, TaskHandle};
use crate::app::store::{DomainConfigUpdate, ViewStateStore};
use crate::core::balance::{self, RebalancePlan};
use crate::core::model::{ActivityStatus, CollectorStatus, EntityKind, QueueLane};
use crate::core::seed;
use crate::util::constants::{
    CANCEL_CHECK_INTERVAL_MS, DEFAULT_BATCH_DELAY_MS, DEFAULT_NONPDF_STEP, DEFAULT_NONPDF_TICK_MS,
    DEFAULT_PDF_STEP, DEFAULT_PDF_TICK_MS, DEFAULT_REBALANCE_DELAY_MS, MAX_EVENTS_PER_PUMP,
    MAX_PENDING_NOTICES,
};
use crate::util::error::{CorpusBoardError, StoreError};
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, TryRecvError};
use std::time::{Duration, Instant};

// =============================================================================
// Public types
// =============================================================================

/// Timed work delivered back to the dashboard by its scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// Advance the next pending item in `lane`.
    QueueTick { lane: QueueLane },

    /// A batch operation's delay has elapsed.
    BatchCompleted { operation: String },

    /// The pending rebalance is due.
    RebalanceDue,
}

/// Pacing of every simulated operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationTiming {
    pub collector: CollectorTiming,
    pub pdf_tick: Duration,
    pub pdf_step: u8,
    pub nonpdf_tick: Duration,
    pub nonpdf_step: u8,
    pub batch_delay: Duration,
    pub rebalance_delay: Duration,
}

impl SimulationTiming {
    /// Tick interval and progress step for a queue lane.
    pub fn lane(&self, lane: QueueLane) -> (Duration, u8) {
        match lane {
            QueueLane::Pdf => (self.pdf_tick, self.pdf_step),
            QueueLane::NonPdf => (self.nonpdf_tick, self.nonpdf_step),
        }
    }
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            collector: CollectorTiming::default(),
            pdf_tick: Duration::from_millis(DEFAULT_PDF_TICK_MS),
            pdf_step: DEFAULT_PDF_STEP,
            nonpdf_tick: Duration::from_millis(DEFAULT_NONPDF_TICK_MS),
            nonpdf_step: DEFAULT_NONPDF_STEP,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            rebalance_delay: Duration::from_millis(DEFAULT_REBALANCE_DELAY_MS),
        }
    }
}

/// Severity of a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn label(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A short message for the user about the outcome of an action.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Owns the store and drives every simulated operation against it.
pub struct Dashboard<B: CollectionBackend = SimulatedBackend> {
    store: ViewStateStore,
    backend: B,
    scheduler: Scheduler<DashboardEvent>,

    /// Event channel of each backend run in flight, by collector.
    runs: HashMap<String, mpsc::Receiver<CollectionEvent>>,

    /// Active queue tickers, one per lane at most.
    processors: HashMap<QueueLane, TaskHandle>,

    /// Batch operations waiting for completion, by name.
    batches: HashMap<String, TaskHandle>,

    /// The pending rebalance, if any.
    rebalance: Option<TaskHandle>,

    timing: SimulationTiming,
    tolerance: f64,
    notices: VecDeque<Notice>,
}

impl Dashboard<SimulatedBackend> {
    /// Dashboard backed by the simulated collector backend.
    pub fn simulated(store: ViewStateStore, timing: SimulationTiming, tolerance: f64) -> Self {
        let backend = SimulatedBackend::new(timing.collector.clone());
        Self::new(store, backend, timing, tolerance)
    }
}

impl<B: CollectionBackend> Dashboard<B> {
    pub fn new(
        store: ViewStateStore,
        backend: B,
        timing: SimulationTiming,
        tolerance: f64,
    ) -> Self {
        Self {
            store,
            backend,
            scheduler: Scheduler::new(),
            runs: HashMap::new(),
            processors: HashMap::new(),
            batches: HashMap::new(),
            rebalance: None,
            timing,
            tolerance,
            notices: VecDeque::new(),
        }
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    /// Mutable access, e.g. to subscribe or enqueue files.
    pub fn store_mut(&mut self) -> &mut ViewStateStore {
        &mut self.store
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    // =========================================================================
    // Collectors
    // =========================================================================

    /// Start collecting for `name`.
    ///
    /// Returns `Ok(false)` if the collector is already running. A backend
    /// refusal leaves the collector untouched and is returned as an error.
    pub fn start_collector(
        &mut self,
        name: &str,
        config: &CollectionConfig,
    ) -> Result<bool, CorpusBoardError> {
        let status = self
            .store
            .collector(name)
            .map(|c| c.status)
            .ok_or_else(|| not_found(EntityKind::Collector, name))?;
        if status == CollectorStatus::Running {
            return Ok(false);
        }

        let (tx, rx) = mpsc::channel();
        if let Err(e) = self.backend.start_collection(name, config, tx) {
            tracing::warn!(collector = name, error = %e, "Backend refused collection");
            self.push_notice(NoticeLevel::Error, e.to_string());
            return Err(e.into());
        }

        self.runs.insert(name.to_string(), rx);
        self.store
            .set_collector_status(name, CollectorStatus::Running)?;
        self.push_notice(NoticeLevel::Success, format!("Started {name} collection"));
        Ok(true)
    }

    /// Stop `name` and return it to idle.
    ///
    /// Returns `Ok(false)` if the collector was already idle.
    pub fn stop_collector(&mut self, name: &str) -> Result<bool, CorpusBoardError> {
        let status = self
            .store
            .collector(name)
            .map(|c| c.status)
            .ok_or_else(|| not_found(EntityKind::Collector, name))?;
        if status == CollectorStatus::Idle {
            return Ok(false);
        }

        self.backend.stop_collection(name);
        self.runs.remove(name);
        self.store.set_collector_status(name, CollectorStatus::Idle)?;
        self.push_notice(NoticeLevel::Warning, format!("Stopped {name} collection"));
        Ok(true)
    }

    // =========================================================================
    // Queue processors
    // =========================================================================

    /// Start ticking through `lane`.
    ///
    /// Returns false if the lane already has a processor or has nothing
    /// left to process.
    pub fn start_processor(&mut self, lane: QueueLane) -> bool {
        if self.processors.contains_key(&lane) {
            tracing::debug!(lane = %lane, "Processor already running");
            return false;
        }
        if self.store.next_pending(lane).is_none() {
            self.push_notice(NoticeLevel::Info, format!("No {lane} files waiting"));
            return false;
        }

        let (interval, _) = self.timing.lane(lane);
        let handle = self
            .scheduler
            .schedule_repeating(interval, move |_| Some(DashboardEvent::QueueTick { lane }));
        self.processors.insert(lane, handle);

        tracing::info!(
            lane = %lane,
            interval_ms = interval.as_millis() as u64,
            "Processor started"
        );
        self.store.record_activity(
            format!("{lane} processing started"),
            ActivityStatus::Running,
            None,
        );
        self.push_notice(NoticeLevel::Info, format!("{lane} processing started"));
        true
    }

    /// Pause `lane`. Items keep the progress they have.
    pub fn stop_processor(&mut self, lane: QueueLane) -> bool {
        let Some(handle) = self.processors.remove(&lane) else {
            return false;
        };
        handle.cancel();

        tracing::info!(lane = %lane, "Processor stopped");
        self.store.record_activity(
            format!("{lane} processing paused"),
            ActivityStatus::Warning,
            None,
        );
        self.push_notice(NoticeLevel::Warning, format!("{lane} processing paused"));
        true
    }

    pub fn is_processing(&self, lane: QueueLane) -> bool {
        self.processors.contains_key(&lane)
    }

    fn on_queue_tick(&mut self, lane: QueueLane) {
        if !self.processors.contains_key(&lane) {
            return;
        }

        let (_, step) = self.timing.lane(lane);
        if let Some(file) = self.store.next_pending(lane).map(|q| q.file.clone()) {
            if let Err(e) = self.store.advance_queue_item(&file, i64::from(step)) {
                tracing::warn!(lane = %lane, file = %file, error = %e, "Queue tick failed");
            }
        }

        if self.store.next_pending(lane).is_none() {
            if let Some(handle) = self.processors.remove(&lane) {
                handle.cancel();
            }
            tracing::info!(lane = %lane, "Lane drained");
            self.store.record_activity(
                format!("{lane} processing finished"),
                ActivityStatus::Success,
                None,
            );
            self.push_notice(NoticeLevel::Success, format!("{lane} processing finished"));
        }
    }

    // =========================================================================
    // Batch operations
    // =========================================================================

    /// Run a named batch operation (deduplicate, quality check, ...).
    ///
    /// Returns false if an operation with the same name is still pending.
    pub fn run_batch_operation(&mut self, operation: &str) -> bool {
        if self.batches.contains_key(operation) {
            return false;
        }

        let handle = self.scheduler.schedule_once(
            self.timing.batch_delay,
            DashboardEvent::BatchCompleted {
                operation: operation.to_string(),
            },
        );
        self.batches.insert(operation.to_string(), handle);

        tracing::info!(operation, "Batch operation started");
        self.store.record_activity(
            format!("{operation} operation started"),
            ActivityStatus::Running,
            None,
        );
        self.push_notice(NoticeLevel::Info, format!("{operation} operation started"));
        true
    }

    fn on_batch_completed(&mut self, operation: String) {
        if self.batches.remove(&operation).is_none() {
            return;
        }
        tracing::info!(operation = %operation, "Batch operation completed");
        let message = format!("{operation} operation completed successfully");
        self.store
            .record_activity(message.clone(), ActivityStatus::Success, None);
        self.push_notice(NoticeLevel::Success, message);
    }

    // =========================================================================
    // Domains
    // =========================================================================

    /// Save new target allocations.
    ///
    /// Every pair is checked before any is applied, so one bad value leaves
    /// all domains unchanged. A target sum that drifts from 1.0 is reported
    /// as a warning notice and not corrected.
    pub fn save_allocations(
        &mut self,
        allocations: &[(String, f64)],
    ) -> Result<(), CorpusBoardError> {
        for (name, fraction) in allocations {
            if !seed::is_fraction(*fraction) {
                let err = StoreError::Validation {
                    field: "target allocation",
                    value: fraction.to_string(),
                    expected: "a fraction between 0.0 and 1.0".to_string(),
                };
                self.push_notice(NoticeLevel::Error, err.to_string());
                return Err(err.into());
            }
            if self.store.domain(name).is_none() {
                let err = not_found(EntityKind::Domain, name);
                self.push_notice(NoticeLevel::Error, err.to_string());
                return Err(err.into());
            }
        }

        for (name, fraction) in allocations {
            self.store.set_domain_allocation(name, *fraction)?;
        }

        self.store.record_activity(
            "Domain allocations saved",
            ActivityStatus::Success,
            Some(format!("{} domains updated", allocations.len())),
        );
        self.push_notice(NoticeLevel::Success, "Domain allocations saved successfully");

        let total = balance::target_total(self.store.domains());
        if !balance::is_normalised(self.store.domains(), self.tolerance) {
            tracing::warn!(total, "Target allocations do not sum to 1.0");
            self.push_notice(
                NoticeLevel::Warning,
                format!("Target allocations sum to {:.1}%, not 100%", total * 100.0),
            );
        }
        Ok(())
    }

    /// Save a domain's quality threshold and keywords.
    pub fn save_domain_config(
        &mut self,
        name: &str,
        update: DomainConfigUpdate,
    ) -> Result<(), CorpusBoardError> {
        match self.store.set_domain_config(name, update) {
            Ok(true) => {
                let message = format!("Domain configuration for {name} updated");
                self.store
                    .record_activity(message.clone(), ActivityStatus::Success, None);
                self.push_notice(NoticeLevel::Success, message);
                Ok(())
            }
            Ok(false) => {
                self.push_notice(
                    NoticeLevel::Info,
                    format!("Domain configuration for {name} unchanged"),
                );
                Ok(())
            }
            Err(e) => {
                self.push_notice(NoticeLevel::Error, e.to_string());
                Err(e.into())
            }
        }
    }

    /// Plan a rebalance and schedule it.
    ///
    /// Returns `None` if a rebalance is already pending.
    pub fn rebalance_corpus(&mut self) -> Option<RebalancePlan> {
        if self.rebalance.is_some() {
            self.push_notice(NoticeLevel::Info, "Rebalancing already in progress");
            return None;
        }

        let plan = balance::plan(self.store.domains(), self.tolerance);
        for action in &plan.actions {
            tracing::info!(action = %action, "Rebalance action");
        }

        self.rebalance = Some(
            self.scheduler
                .schedule_once(self.timing.rebalance_delay, DashboardEvent::RebalanceDue),
        );
        self.store.record_activity(
            "Domain rebalancing started",
            ActivityStatus::Running,
            Some(format!("{} actions planned", plan.actions.len())),
        );
        self.push_notice(NoticeLevel::Info, "Domain rebalancing started");
        Some(plan)
    }

    pub fn is_rebalancing(&self) -> bool {
        self.rebalance.is_some()
    }

    fn on_rebalance_due(&mut self) {
        if self.rebalance.take().is_none() {
            return;
        }
        let adjusted = self.store.apply_rebalance(self.tolerance);
        self.push_notice(
            NoticeLevel::Success,
            format!("Corpus rebalancing completed ({adjusted} domains adjusted)"),
        );
    }

    // =========================================================================
    // Event pump
    // =========================================================================

    /// Apply every pending scheduler and backend event. Returns how many
    /// were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;

        for event in self.scheduler.poll() {
            self.handle_event(event);
            applied += 1;
        }

        let mut events = Vec::new();
        let mut disconnected = Vec::new();
        'runs: for (collector, rx) in &self.runs {
            loop {
                if events.len() >= MAX_EVENTS_PER_PUMP {
                    break 'runs;
                }
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected.push(collector.clone());
                        break;
                    }
                }
            }
        }

        for event in events {
            self.handle_collection_event(event);
            applied += 1;
        }

        // A run whose sender is gone without a final event has died.
        for collector in disconnected {
            if self.runs.contains_key(&collector) {
                self.handle_collection_event(CollectionEvent::Failed {
                    collector,
                    reason: "backend disconnected".to_string(),
                });
                applied += 1;
            }
        }

        if applied > 0 {
            tracing::trace!(applied, "Pumped events");
        }
        applied
    }

    /// Pump until at least one event is applied or `timeout` passes.
    pub fn pump_for(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let applied = self.pump();
            if applied > 0 || Instant::now() >= deadline {
                return applied;
            }
            std::thread::sleep(Duration::from_millis(CANCEL_CHECK_INTERVAL_MS));
        }
    }

    fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::QueueTick { lane } => self.on_queue_tick(lane),
            DashboardEvent::BatchCompleted { operation } => self.on_batch_completed(operation),
            DashboardEvent::RebalanceDue => self.on_rebalance_due(),
        }
    }

    fn handle_collection_event(&mut self, event: CollectionEvent) {
        // A run that already finished may have left events in this batch.
        if !self.runs.contains_key(event.collector()) {
            tracing::debug!(collector = event.collector(), "Event for inactive run dropped");
            return;
        }

        let result = match event {
            CollectionEvent::Progress { collector, percent } => self
                .store
                .record_collector_progress(&collector, percent)
                .map(|_| ()),
            CollectionEvent::Completed {
                collector,
                documents_added,
            } => {
                self.runs.remove(&collector);
                let result = self.store.complete_collection(&collector, documents_added);
                if matches!(result, Ok(true)) {
                    self.push_notice(
                        NoticeLevel::Success,
                        format!("{collector} collection completed ({documents_added} documents)"),
                    );
                }
                result.map(|_| ())
            }
            CollectionEvent::Failed { collector, reason } => {
                self.runs.remove(&collector);
                self.backend.stop_collection(&collector);
                let result = self.store.fail_collector(&collector, &reason);
                if matches!(result, Ok(true)) {
                    self.push_notice(
                        NoticeLevel::Error,
                        format!("{collector} collection failed: {reason}"),
                    );
                }
                result.map(|_| ())
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Collection event rejected by store");
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// True while any timed task or backend run is outstanding.
    pub fn is_busy(&self) -> bool {
        self.scheduler.active_tasks() > 0 || !self.runs.is_empty()
    }

    /// Cancel all outstanding work. Collectors with a run in flight return
    /// to idle; other store contents are kept.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        self.backend.shutdown();
        for (collector, _) in self.runs.drain() {
            if let Err(e) = self
                .store
                .set_collector_status(&collector, CollectorStatus::Idle)
            {
                tracing::warn!(collector = %collector, error = %e, "Could not reset collector");
            }
        }
        self.processors.clear();
        self.batches.clear();
        self.rebalance = None;
        tracing::info!("Dashboard shut down");
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.notices.len() >= MAX_PENDING_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            message: message.into(),
        });
    }
}

fn not_found(kind: EntityKind, name: &str) -> StoreError {
    StoreError::NotFound {
        kind: kind.label(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::load_builtin;
    use crate::util::error::CollectionError;

    /// Test backend that records calls and refuses one collector. The
    /// event sender of every accepted run is kept so tests can report on
    /// the run's behalf.
    #[derive(Default)]
    struct RecordingBackend {
        started: Vec<String>,
        stopped: Vec<String>,
        senders: Vec<mpsc::Sender<CollectionEvent>>,
        refuse: Option<String>,
    }

    impl CollectionBackend for RecordingBackend {
        fn start_collection(
            &mut self,
            collector: &str,
            _config: &CollectionConfig,
            events: mpsc::Sender<CollectionEvent>,
        ) -> Result<(), CollectionError> {
            if self.refuse.as_deref() == Some(collector) {
                return Err(CollectionError::Unavailable {
                    collector: collector.to_string(),
                    reason: "offline".to_string(),
                });
            }
            self.started.push(collector.to_string());
            self.senders.push(events);
            Ok(())
        }

        fn stop_collection(&mut self, collector: &str) {
            self.stopped.push(collector.to_string());
        }
    }

    fn recording_dashboard(refuse: Option<&str>) -> Dashboard<RecordingBackend> {
        let store = ViewStateStore::from_dataset(load_builtin().unwrap());
        let backend = RecordingBackend {
            refuse: refuse.map(str::to_string),
            ..Default::default()
        };
        Dashboard::new(store, backend, SimulationTiming::default(), 0.01)
    }

    #[test]
    fn test_start_collector_marks_running() {
        let mut dashboard = recording_dashboard(None);

        assert!(dashboard
            .start_collector("arXiv", &CollectionConfig::default())
            .unwrap());
        assert!(!dashboard
            .start_collector("arXiv", &CollectionConfig::default())
            .unwrap());

        assert_eq!(dashboard.backend.started, vec!["arXiv".to_string()]);
        assert_eq!(
            dashboard.store().collector("arXiv").unwrap().status,
            CollectorStatus::Running
        );
        assert!(dashboard.is_busy());
        let notices = dashboard.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Success);
    }

    #[test]
    fn test_backend_refusal_leaves_collector_idle() {
        let mut dashboard = recording_dashboard(Some("FRED"));
        let before = dashboard.store().activity().len();

        let err = dashboard
            .start_collector("FRED", &CollectionConfig::default())
            .unwrap_err();

        assert!(matches!(err, CorpusBoardError::Collection(_)));
        assert_eq!(
            dashboard.store().collector("FRED").unwrap().status,
            CollectorStatus::Idle
        );
        assert_eq!(dashboard.store().activity().len(), before);
        assert_eq!(dashboard.take_notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_unknown_collector_is_reported() {
        let mut dashboard = recording_dashboard(None);
        let err = dashboard
            .start_collector("Nonexistent", &CollectionConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CorpusBoardError::Store(StoreError::NotFound { .. })
        ));
        assert!(dashboard.stop_collector("Nonexistent").is_err());
    }

    #[test]
    fn test_stop_seeded_running_collector() {
        let mut dashboard = recording_dashboard(None);

        assert!(dashboard.stop_collector("GitHub").unwrap());
        assert!(!dashboard.stop_collector("GitHub").unwrap());

        assert_eq!(dashboard.backend.stopped, vec!["GitHub".to_string()]);
        assert!(dashboard.store().activity()[0]
            .action
            .contains("Stopped GitHub"));
    }

    fn completed(collector: &str, documents_added: u64) -> CollectionEvent {
        CollectionEvent::Completed {
            collector: collector.to_string(),
            documents_added,
        }
    }

    #[test]
    fn test_events_for_stopped_runs_are_dropped() {
        let mut dashboard = recording_dashboard(None);
        dashboard
            .start_collector("arXiv", &CollectionConfig::default())
            .unwrap();
        dashboard.stop_collector("arXiv").unwrap();

        // The receiver is gone, so the stale run cannot deliver.
        assert!(dashboard.backend.senders[0].send(completed("arXiv", 99)).is_err());
        dashboard.pump();

        assert_eq!(dashboard.store().collector("arXiv").unwrap().documents, 234);
    }

    #[test]
    fn test_stale_run_events_do_not_reach_restarted_run() {
        let mut dashboard = recording_dashboard(None);
        let config = CollectionConfig::default();

        dashboard.start_collector("arXiv", &config).unwrap();
        // Queued by the first run before it is stopped.
        let _ = dashboard.backend.senders[0].send(completed("arXiv", 99));
        dashboard.stop_collector("arXiv").unwrap();
        dashboard.start_collector("arXiv", &config).unwrap();

        dashboard.pump();

        let arxiv = dashboard.store().collector("arXiv").unwrap();
        assert_eq!(arxiv.documents, 234);
        assert_eq!(arxiv.status, CollectorStatus::Running);
        assert!(dashboard.is_busy());

        // The new run still reports normally.
        dashboard.backend.senders[1].send(completed("arXiv", 5)).unwrap();
        dashboard.pump();
        let arxiv = dashboard.store().collector("arXiv").unwrap();
        assert_eq!(arxiv.documents, 239);
        assert_eq!(arxiv.status, CollectorStatus::Idle);
        assert!(!dashboard.is_busy());
    }

    #[test]
    fn test_run_that_drops_its_sender_fails() {
        let mut dashboard = recording_dashboard(None);
        dashboard
            .start_collector("arXiv", &CollectionConfig::default())
            .unwrap();

        dashboard.backend.senders.clear();
        dashboard.pump();

        assert_eq!(
            dashboard.store().collector("arXiv").unwrap().status,
            CollectorStatus::Error
        );
        assert_eq!(
            dashboard.store().activity()[0].details.as_deref(),
            Some("backend disconnected")
        );
        assert!(!dashboard.is_busy());
    }

    #[test]
    fn test_shutdown_returns_running_collectors_to_idle() {
        let mut dashboard = recording_dashboard(None);
        dashboard
            .start_collector("arXiv", &CollectionConfig::default())
            .unwrap();

        dashboard.shutdown();

        assert_eq!(
            dashboard.store().collector("arXiv").unwrap().status,
            CollectorStatus::Idle
        );
        // GitHub is seeded as running with no run behind it.
        assert_eq!(dashboard.store().stats().running_collectors, 1);
        assert!(!dashboard.is_busy());
    }

    #[test]
    fn test_save_allocations_is_all_or_nothing() {
        let mut dashboard = recording_dashboard(None);
        let before = dashboard.store().domains().to_vec();

        let result = dashboard.save_allocations(&[
            ("DeFi".to_string(), 0.2),
            ("Risk Management".to_string(), 1.5),
        ]);

        assert!(result.is_err());
        assert_eq!(dashboard.store().domains(), before.as_slice());
    }

    #[test]
    fn test_save_allocations_warns_when_targets_drift() {
        let mut dashboard = recording_dashboard(None);

        dashboard
            .save_allocations(&[("DeFi".to_string(), 0.5)])
            .unwrap();

        assert_eq!(dashboard.store().domain("DeFi").unwrap().target_allocation, 0.5);
        let notices = dashboard.take_notices();
        assert!(notices.iter().any(|n| n.level == NoticeLevel::Warning));
    }

    #[test]
    fn test_save_domain_config_logs_and_notifies() {
        let mut dashboard = recording_dashboard(None);

        dashboard
            .save_domain_config(
                "DeFi",
                DomainConfigUpdate {
                    min_quality: Some(0.8),
                    keywords: Some(vec!["lending".to_string()]),
                },
            )
            .unwrap();

        assert_eq!(
            dashboard.store().activity()[0].action,
            "Domain configuration for DeFi updated"
        );
        assert_eq!(dashboard.take_notices()[0].level, NoticeLevel::Success);

        let before = dashboard.store().activity().len();
        let err = dashboard
            .save_domain_config(
                "DeFi",
                DomainConfigUpdate {
                    min_quality: Some(80.0),
                    keywords: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CorpusBoardError::Store(StoreError::Validation { .. })));
        assert_eq!(dashboard.store().activity().len(), before);
        assert_eq!(dashboard.take_notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_only_one_rebalance_pending() {
        let mut dashboard = recording_dashboard(None);

        let plan = dashboard.rebalance_corpus().unwrap();
        assert!(!plan.is_empty());
        assert!(dashboard.rebalance_corpus().is_none());
        assert!(dashboard.is_rebalancing());

        dashboard.shutdown();
        assert!(!dashboard.is_rebalancing());
        assert!(!dashboard.is_busy());
    }

    #[test]
    fn test_notice_queue_is_bounded() {
        let mut dashboard = recording_dashboard(None);
        for i in 0..(MAX_PENDING_NOTICES + 10) {
            dashboard.push_notice(NoticeLevel::Info, format!("notice {i}"));
        }
        let notices = dashboard.take_notices();
        assert_eq!(notices.len(), MAX_PENDING_NOTICES);
        assert_eq!(notices[0].message, "notice 10");
        assert!(dashboard.take_notices().is_empty());
    }
}
