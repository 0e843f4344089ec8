// corpusboard - app/store.rs
//
// ViewStateStore: the single source of truth for collectors, domains, the
// processing queue and the activity log.
//
// Architecture:
//   - The store is a plain value owned by one thread (the dashboard). It is
//     never shared; background work reaches it only as events applied by
//     the owner (see app::dashboard).
//   - Reads return borrowed slices. Every mutation either fully applies or
//     returns a `StoreError` before touching anything.
//   - Subscribers are invoked synchronously after each change with the
//     entity kind and identifier. A subscriber cannot borrow the store while
//     it runs; it records what changed and the view re-reads afterwards.

use crate::core::balance::{self, AllocationStatus};
use crate::core::corpus;
use crate::core::model::{
    ActivityEntry, ActivityStatus, Change, Collector, CollectorStatus, CorpusDocument,
    CorpusStats, Domain, EntityKind, QueueItem, QueueLane, QueueStatus, Snapshot,
};
use crate::core::seed::{self, Dataset};
use crate::util::constants::{MAX_DOMAIN_KEYWORDS, MAX_PROGRESS};
use crate::util::error::StoreError;
use chrono::{DateTime, Utc};

/// Boxed change callback.
pub type Subscriber = Box<dyn FnMut(&Change)>;

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Per-domain settings to change. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainConfigUpdate {
    pub min_quality: Option<f64>,
    pub keywords: Option<Vec<String>>,
}

/// In-memory dashboard state with change notification.
pub struct ViewStateStore {
    collectors: Vec<Collector>,
    domains: Vec<Domain>,
    queue: Vec<QueueItem>,

    /// Newest first.
    activity: Vec<ActivityEntry>,

    documents: Vec<CorpusDocument>,
    corpus_root: String,

    total_size_gb: f64,
    next_activity_id: u64,
    last_updated: DateTime<Utc>,

    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription_id: u64,
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("collectors", &self.collectors.len())
            .field("domains", &self.domains.len())
            .field("queue", &self.queue.len())
            .field("activity", &self.activity.len())
            .field("documents", &self.documents.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ViewStateStore {
    /// Seed a store from a validated dataset.
    pub fn from_dataset(dataset: Dataset) -> Self {
        // Seed entries are newest-first; number them oldest-first so IDs
        // keep increasing with time.
        let seeded = dataset.activity.len() as u64;
        let activity: Vec<ActivityEntry> = dataset
            .activity
            .into_iter()
            .enumerate()
            .map(|(idx, seed)| ActivityEntry {
                id: seeded - idx as u64,
                timestamp: seed.timestamp,
                action: seed.action,
                status: seed.status,
                details: seed.details,
            })
            .collect();

        tracing::info!(
            collectors = dataset.collectors.len(),
            domains = dataset.domains.len(),
            queue = dataset.queue.len(),
            activity = activity.len(),
            documents = dataset.documents.len(),
            "Store seeded"
        );

        Self {
            collectors: dataset.collectors,
            domains: dataset.domains,
            queue: dataset.queue,
            activity,
            documents: dataset.documents,
            corpus_root: dataset.corpus.root,
            total_size_gb: dataset.corpus.total_size_gb,
            next_activity_id: seeded + 1,
            last_updated: Utc::now(),
            subscribers: Vec::new(),
            next_subscription_id: 1,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn collectors(&self) -> &[Collector] {
        &self.collectors
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }

    /// Activity log, newest first.
    pub fn activity(&self) -> &[ActivityEntry] {
        &self.activity
    }

    pub fn collector(&self, name: &str) -> Option<&Collector> {
        self.collectors.iter().find(|c| c.name == name)
    }

    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn queue_item(&self, file: &str) -> Option<&QueueItem> {
        self.queue.iter().find(|q| q.file == file)
    }

    /// Document catalogue, in dataset order.
    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    /// Look a document up by title (see `corpus::find_document`).
    pub fn document(&self, title: &str) -> Option<&CorpusDocument> {
        corpus::find_document(&self.documents, title)
    }

    /// Directory documents are filed under.
    pub fn corpus_root(&self) -> &str {
        &self.corpus_root
    }

    /// First item in `lane` that has not completed, in queue order.
    pub fn next_pending(&self, lane: QueueLane) -> Option<&QueueItem> {
        self.queue
            .iter()
            .find(|q| q.lane == lane && q.status != QueueStatus::Completed)
    }

    /// Corpus-wide figures derived from the current contents.
    pub fn stats(&self) -> CorpusStats {
        let count = |status: QueueStatus| self.queue.iter().filter(|q| q.status == status).count();
        let average_quality = if self.domains.is_empty() {
            0.0
        } else {
            self.domains.iter().map(|d| d.quality).sum::<f64>() / self.domains.len() as f64
        };

        CorpusStats {
            total_documents: self.domains.iter().map(|d| d.documents).sum(),
            total_size_gb: self.total_size_gb,
            average_quality,
            queued: count(QueueStatus::Queued),
            processing: count(QueueStatus::Processing),
            completed: count(QueueStatus::Completed),
            running_collectors: self
                .collectors
                .iter()
                .filter(|c| c.status == CollectorStatus::Running)
                .count(),
            last_updated: self.last_updated,
        }
    }

    /// Borrowed view of everything, for export.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            stats: self.stats(),
            collectors: &self.collectors,
            domains: &self.domains,
            queue: &self.queue,
            activity: &self.activity,
            documents: &self.documents,
        }
    }

    // =========================================================================
    // Collectors
    // =========================================================================

    /// Move a collector to `status` and log the transition.
    ///
    /// Setting the status a collector already has (running -> running in
    /// particular) is a no-op and returns `Ok(false)`. So is `Error` for a
    /// collector that is not running: only a run can fail.
    pub fn set_collector_status(
        &mut self,
        name: &str,
        status: CollectorStatus,
    ) -> Result<bool, StoreError> {
        let idx = self.collector_index(name)?;
        let current = self.collectors[idx].status;
        if current == status {
            tracing::debug!(collector = name, status = %status, "Collector already in status");
            return Ok(false);
        }
        if status == CollectorStatus::Error && current != CollectorStatus::Running {
            tracing::debug!(
                collector = name,
                from = %current,
                "Error for non-running collector ignored"
            );
            return Ok(false);
        }

        let name = &self.collectors[idx].name;
        let action = match status {
            CollectorStatus::Running => format!("Started {name} collection"),
            CollectorStatus::Idle | CollectorStatus::Stopped => {
                format!("Stopped {name} collection")
            }
            CollectorStatus::Error => format!("{name} collection failed"),
        };
        self.transition_collector(idx, status, action, None);
        Ok(true)
    }

    /// External failure signal: running -> error.
    ///
    /// Ignored (returns `Ok(false)`) unless the collector is running.
    pub fn fail_collector(&mut self, name: &str, reason: &str) -> Result<bool, StoreError> {
        let idx = self.collector_index(name)?;
        if self.collectors[idx].status != CollectorStatus::Running {
            tracing::debug!(collector = name, "Failure signal for idle collector ignored");
            return Ok(false);
        }

        let action = format!("{} collection failed", self.collectors[idx].name);
        self.transition_collector(
            idx,
            CollectorStatus::Error,
            action,
            Some(reason.to_string()),
        );
        Ok(true)
    }

    /// Record progress reported by a running collector.
    ///
    /// Progress only moves forward and is clamped to 100. Reports for
    /// collectors that are not running (e.g. arriving after a stop) are
    /// ignored.
    pub fn record_collector_progress(
        &mut self,
        name: &str,
        percent: u8,
    ) -> Result<bool, StoreError> {
        let idx = self.collector_index(name)?;
        let collector = &mut self.collectors[idx];
        let percent = percent.min(MAX_PROGRESS);
        if collector.status != CollectorStatus::Running || percent <= collector.progress {
            return Ok(false);
        }

        collector.progress = percent;
        tracing::trace!(collector = %collector.name, percent, "Collector progress");
        let change = Change::new(EntityKind::Collector, collector.name.clone());
        self.notify(&change);
        Ok(true)
    }

    /// A running collector finished: back to idle with its haul recorded.
    pub fn complete_collection(
        &mut self,
        name: &str,
        documents_added: u64,
    ) -> Result<bool, StoreError> {
        let idx = self.collector_index(name)?;
        if self.collectors[idx].status != CollectorStatus::Running {
            tracing::debug!(collector = name, "Completion for idle collector ignored");
            return Ok(false);
        }

        let collector = &mut self.collectors[idx];
        collector.documents = collector.documents.saturating_add(documents_added);
        collector.last_run = Some(Utc::now().date_naive());
        let action = format!("{} collection completed", collector.name);
        self.transition_collector(
            idx,
            CollectorStatus::Idle,
            action,
            Some(format!("{documents_added} documents collected")),
        );
        Ok(true)
    }

    fn transition_collector(
        &mut self,
        idx: usize,
        status: CollectorStatus,
        action: String,
        details: Option<String>,
    ) {
        let collector = &mut self.collectors[idx];
        let previous = collector.status;
        collector.status = status;
        collector.progress = 0;

        tracing::info!(
            collector = %collector.name,
            from = %previous,
            to = %status,
            "Collector status changed"
        );

        let activity_status = match status {
            CollectorStatus::Running => ActivityStatus::Running,
            CollectorStatus::Error => ActivityStatus::Error,
            CollectorStatus::Idle if details.is_some() => ActivityStatus::Success,
            CollectorStatus::Idle | CollectorStatus::Stopped => ActivityStatus::Warning,
        };

        let change = Change::new(EntityKind::Collector, collector.name.clone());
        self.notify(&change);
        self.push_activity(action, activity_status, details);
    }

    // =========================================================================
    // Processing queue
    // =========================================================================

    /// Advance a queue item's progress by `delta` percentage points.
    ///
    /// Negative deltas count as zero and progress saturates at 100, so
    /// progress never decreases. The first nonzero advance moves a queued
    /// item to processing; reaching 100 completes it (and logs it) exactly
    /// once. Completed items ignore further advances.
    pub fn advance_queue_item(
        &mut self,
        file: &str,
        delta: i64,
    ) -> Result<QueueStatus, StoreError> {
        let idx = self.queue_index(file)?;
        let item = &mut self.queue[idx];

        let step = delta.clamp(0, i64::from(MAX_PROGRESS)) as u8;
        if item.status == QueueStatus::Completed || step == 0 {
            return Ok(item.status);
        }

        item.progress = item.progress.saturating_add(step).min(MAX_PROGRESS);
        item.status = if item.progress == MAX_PROGRESS {
            QueueStatus::Completed
        } else {
            QueueStatus::Processing
        };

        let status = item.status;
        let file = item.file.clone();
        tracing::debug!(
            file = %file,
            progress = item.progress,
            status = %status,
            "Queue item advanced"
        );

        self.notify(&Change::new(EntityKind::QueueItem, file.clone()));
        if status == QueueStatus::Completed {
            tracing::info!(file = %file, "Queue item completed");
            self.push_activity(
                format!("Processing completed for {file}"),
                ActivityStatus::Success,
                None,
            );
        }
        Ok(status)
    }

    /// Append a new queued item to the end of the queue.
    pub fn enqueue(&mut self, file: &str, lane: QueueLane) -> Result<(), StoreError> {
        if file.trim().is_empty() {
            return Err(StoreError::Validation {
                field: "file name",
                value: file.to_string(),
                expected: "a non-empty file name".to_string(),
            });
        }
        if self.queue_item(file).is_some() {
            return Err(StoreError::Validation {
                field: "file name",
                value: file.to_string(),
                expected: "a file that is not already queued".to_string(),
            });
        }

        self.queue.push(QueueItem {
            file: file.to_string(),
            lane,
            status: QueueStatus::Queued,
            progress: 0,
        });
        self.notify(&Change::new(EntityKind::QueueItem, file));
        self.push_activity(
            format!("Queued {file} for {lane} processing"),
            ActivityStatus::Info,
            None,
        );
        Ok(())
    }

    // =========================================================================
    // Domains
    // =========================================================================

    /// Set one domain's target allocation.
    ///
    /// The value is validated before the lookup, so a bad fraction never
    /// changes anything. Other domains are left untouched; targets are not
    /// renormalised.
    pub fn set_domain_allocation(&mut self, name: &str, fraction: f64) -> Result<(), StoreError> {
        if !seed::is_fraction(fraction) {
            return Err(StoreError::Validation {
                field: "target allocation",
                value: fraction.to_string(),
                expected: "a fraction between 0.0 and 1.0".to_string(),
            });
        }

        let idx = self.domain_index(name)?;
        let domain = &mut self.domains[idx];
        let previous = domain.target_allocation;
        domain.target_allocation = fraction;

        tracing::info!(
            domain = %domain.name,
            from = previous,
            to = fraction,
            "Target allocation changed"
        );
        let change = Change::new(EntityKind::Domain, domain.name.clone());
        self.notify(&change);
        Ok(())
    }

    /// Change a domain's quality threshold and keyword list.
    ///
    /// Both values are validated before the lookup. Keywords are trimmed and
    /// deduplicated ignoring case. Returns `Ok(false)` when nothing differs
    /// from the current settings.
    pub fn set_domain_config(
        &mut self,
        name: &str,
        update: DomainConfigUpdate,
    ) -> Result<bool, StoreError> {
        if let Some(min_quality) = update.min_quality {
            if !seed::is_fraction(min_quality) {
                return Err(StoreError::Validation {
                    field: "minimum quality",
                    value: min_quality.to_string(),
                    expected: "a fraction between 0.0 and 1.0".to_string(),
                });
            }
        }
        let keywords = update.keywords.map(|k| corpus::normalise_keywords(&k));
        if let Some(keywords) = &keywords {
            if keywords.len() > MAX_DOMAIN_KEYWORDS {
                return Err(StoreError::Validation {
                    field: "keywords",
                    value: keywords.len().to_string(),
                    expected: format!("at most {MAX_DOMAIN_KEYWORDS} keywords"),
                });
            }
        }

        let idx = self.domain_index(name)?;
        let domain = &mut self.domains[idx];
        let mut changed = false;
        if let Some(min_quality) = update.min_quality {
            if domain.min_quality != min_quality {
                domain.min_quality = min_quality;
                changed = true;
            }
        }
        if let Some(keywords) = keywords {
            if domain.keywords != keywords {
                domain.keywords = keywords;
                changed = true;
            }
        }
        if !changed {
            return Ok(false);
        }

        tracing::info!(
            domain = %domain.name,
            min_quality = domain.min_quality,
            keywords = domain.keywords.len(),
            "Domain configuration changed"
        );
        let change = Change::new(EntityKind::Domain, domain.name.clone());
        self.notify(&change);
        Ok(true)
    }

    /// Pull every domain outside the tolerance band onto its target.
    ///
    /// Returns the number of domains adjusted and logs the outcome.
    pub fn apply_rebalance(&mut self, tolerance: f64) -> usize {
        let mut adjusted = Vec::new();
        for domain in &mut self.domains {
            if balance::allocation_status(domain, tolerance) != AllocationStatus::Balanced {
                tracing::debug!(
                    domain = %domain.name,
                    from = domain.current_allocation,
                    to = domain.target_allocation,
                    "Rebalancing domain"
                );
                domain.current_allocation = domain.target_allocation;
                adjusted.push(domain.name.clone());
            }
        }

        for name in &adjusted {
            self.notify(&Change::new(EntityKind::Domain, name.clone()));
        }

        let count = adjusted.len();
        tracing::info!(adjusted = count, "Rebalance applied");
        self.push_activity(
            "Corpus rebalancing completed",
            ActivityStatus::Success,
            Some(format!("{count} domains adjusted")),
        );
        count
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Append a free-form entry to the activity log. Returns its ID.
    pub fn record_activity(
        &mut self,
        action: impl Into<String>,
        status: ActivityStatus,
        details: Option<String>,
    ) -> u64 {
        self.push_activity(action, status, details)
    }

    fn push_activity(
        &mut self,
        action: impl Into<String>,
        status: ActivityStatus,
        details: Option<String>,
    ) -> u64 {
        let id = self.next_activity_id;
        self.next_activity_id += 1;

        let entry = ActivityEntry {
            id,
            timestamp: Utc::now(),
            action: action.into(),
            status,
            details,
        };
        tracing::debug!(id, action = %entry.action, status = %status, "Activity recorded");
        self.activity.insert(0, entry);

        self.notify(&Change::new(EntityKind::Activity, id.to_string()));
        id
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Register a callback run after every change.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Change) + 'static,
    {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        tracing::debug!(subscription = id.0, "Subscriber added");
        id
    }

    /// Remove a subscriber. Returns false if the handle was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&mut self, change: &Change) {
        self.last_updated = Utc::now();
        for (_, callback) in self.subscribers.iter_mut() {
            callback(change);
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    fn collector_index(&self, name: &str) -> Result<usize, StoreError> {
        self.collectors
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| not_found(EntityKind::Collector, name))
    }

    fn domain_index(&self, name: &str) -> Result<usize, StoreError> {
        self.domains
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| not_found(EntityKind::Domain, name))
    }

    fn queue_index(&self, file: &str) -> Result<usize, StoreError> {
        self.queue
            .iter()
            .position(|q| q.file == file)
            .ok_or_else(|| not_found(EntityKind::QueueItem, file))
    }
}

fn not_found(kind: EntityKind, name: &str) -> StoreError {
    StoreError::NotFound {
        kind: kind.label(),
        name: name.to_string(),
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::{load_builtin, parse_dataset};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn builtin_store() -> ViewStateStore {
        ViewStateStore::from_dataset(load_builtin().unwrap())
    }

    fn store_from(toml: &str) -> ViewStateStore {
        ViewStateStore::from_dataset(parse_dataset(toml, &PathBuf::from("test.toml")).unwrap())
    }

    /// Collect every change notification into a shared Vec.
    fn record_changes(store: &mut ViewStateStore) -> Rc<RefCell<Vec<Change>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        store.subscribe(move |change| sink.borrow_mut().push(change.clone()));
        log
    }

    const QUEUE_TOML: &str = r#"
[[queue]]
file = "a.pdf"
status = "processing"
progress = 95

[[queue]]
file = "b.pdf"
status = "queued"
"#;

    #[test]
    fn test_seed_activity_ids_increase_with_age() {
        let store = builtin_store();
        let ids: Vec<u64> = store.activity().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
        assert_eq!(store.activity()[0].action, "GitHub collection started");
    }

    #[test]
    fn test_stopping_github_logs_one_entry() {
        let mut store = builtin_store();
        let before = store.activity().len();

        let changed = store.set_collector_status("GitHub", CollectorStatus::Idle).unwrap();

        assert!(changed);
        assert_eq!(store.collector("GitHub").unwrap().status, CollectorStatus::Idle);
        assert_eq!(store.activity().len(), before + 1);
        assert!(store.activity()[0].action.contains("Stopped GitHub"));
        assert_eq!(store.activity()[0].status, ActivityStatus::Warning);
    }

    #[test]
    fn test_running_to_running_is_a_noop() {
        let mut store = builtin_store();
        let changes = record_changes(&mut store);
        let before = store.activity().len();

        let changed = store
            .set_collector_status("GitHub", CollectorStatus::Running)
            .unwrap();

        assert!(!changed);
        assert_eq!(store.activity().len(), before);
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_error_status_requires_running_collector() {
        let mut store = builtin_store();
        let changes = record_changes(&mut store);
        let before = store.activity().len();

        let changed = store
            .set_collector_status("arXiv", CollectorStatus::Error)
            .unwrap();

        assert!(!changed);
        assert_eq!(store.collector("arXiv").unwrap().status, CollectorStatus::Idle);
        assert_eq!(store.activity().len(), before);
        assert!(changes.borrow().is_empty());

        assert!(store
            .set_collector_status("GitHub", CollectorStatus::Error)
            .unwrap());
        assert_eq!(store.activity()[0].action, "GitHub collection failed");
    }

    #[test]
    fn test_unknown_collector_is_not_found_and_store_unchanged() {
        let mut store = builtin_store();
        let collectors_before = store.collectors().to_vec();
        let activity_before = store.activity().len();

        let err = store
            .set_collector_status("Nonexistent", CollectorStatus::Running)
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::NotFound {
                kind: "collector",
                name: "Nonexistent".to_string()
            }
        );
        assert_eq!(store.collectors(), collectors_before.as_slice());
        assert_eq!(store.activity().len(), activity_before);
    }

    #[test]
    fn test_failure_only_from_running() {
        let mut store = builtin_store();

        assert!(!store.fail_collector("arXiv", "timeout").unwrap());
        assert_eq!(store.collector("arXiv").unwrap().status, CollectorStatus::Idle);

        assert!(store.fail_collector("GitHub", "rate limited").unwrap());
        let github = store.collector("GitHub").unwrap();
        assert_eq!(github.status, CollectorStatus::Error);
        assert_eq!(store.activity()[0].action, "GitHub collection failed");
        assert_eq!(store.activity()[0].details.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_collector_progress_is_monotonic_and_requires_running() {
        let mut store = builtin_store();

        assert!(!store.record_collector_progress("arXiv", 40).unwrap());

        assert!(store.record_collector_progress("GitHub", 40).unwrap());
        assert!(!store.record_collector_progress("GitHub", 30).unwrap());
        assert!(store.record_collector_progress("GitHub", 250).unwrap());
        assert_eq!(store.collector("GitHub").unwrap().progress, 100);
    }

    #[test]
    fn test_completion_records_documents_and_resets() {
        let mut store = builtin_store();
        store.record_collector_progress("GitHub", 60).unwrap();

        assert!(store.complete_collection("GitHub", 11).unwrap());

        let github = store.collector("GitHub").unwrap();
        assert_eq!(github.status, CollectorStatus::Idle);
        assert_eq!(github.documents, 100);
        assert_eq!(github.progress, 0);
        assert_eq!(github.last_run, Some(Utc::now().date_naive()));
        assert_eq!(store.activity()[0].action, "GitHub collection completed");
        assert_eq!(store.activity()[0].status, ActivityStatus::Success);
        assert_eq!(
            store.activity()[0].details.as_deref(),
            Some("11 documents collected")
        );

        // A late completion after the collector went idle changes nothing.
        assert!(!store.complete_collection("GitHub", 5).unwrap());
        assert_eq!(store.collector("GitHub").unwrap().documents, 100);
    }

    #[test]
    fn test_advance_clamps_to_100_and_completes() {
        let mut store = store_from(QUEUE_TOML);

        let status = store.advance_queue_item("a.pdf", 10).unwrap();

        assert_eq!(status, QueueStatus::Completed);
        let item = store.queue_item("a.pdf").unwrap();
        assert_eq!(item.progress, 100);
        assert_eq!(item.status, QueueStatus::Completed);
        assert_eq!(store.activity()[0].action, "Processing completed for a.pdf");
    }

    #[test]
    fn test_completion_is_logged_exactly_once() {
        let mut store = store_from(QUEUE_TOML);
        store.advance_queue_item("a.pdf", 50).unwrap();
        store.advance_queue_item("a.pdf", 50).unwrap();
        store.advance_queue_item("a.pdf", 5).unwrap();

        let completions = store
            .activity()
            .iter()
            .filter(|a| a.action == "Processing completed for a.pdf")
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut store = store_from(QUEUE_TOML);
        let deltas = [0, 7, -20, 13, i64::MIN, 3, -1, 250, 9, i64::MAX];
        let mut last = 0;
        for delta in deltas {
            store.advance_queue_item("b.pdf", delta).unwrap();
            let progress = store.queue_item("b.pdf").unwrap().progress;
            assert!(progress >= last, "delta {delta}: {progress} < {last}");
            assert!(progress <= 100);
            last = progress;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_first_nonzero_advance_starts_processing() {
        let mut store = store_from(QUEUE_TOML);

        assert_eq!(
            store.advance_queue_item("b.pdf", 0).unwrap(),
            QueueStatus::Queued
        );
        assert_eq!(
            store.advance_queue_item("b.pdf", -5).unwrap(),
            QueueStatus::Queued
        );
        assert_eq!(
            store.advance_queue_item("b.pdf", 1).unwrap(),
            QueueStatus::Processing
        );
    }

    #[test]
    fn test_advance_unknown_file_is_not_found() {
        let mut store = store_from(QUEUE_TOML);
        assert!(matches!(
            store.advance_queue_item("missing.pdf", 5),
            Err(StoreError::NotFound { kind: "queue item", .. })
        ));
    }

    #[test]
    fn test_enqueue_rejects_duplicates_and_blank_names() {
        let mut store = store_from(QUEUE_TOML);

        store.enqueue("c.epub", QueueLane::NonPdf).unwrap();
        assert_eq!(store.next_pending(QueueLane::NonPdf).unwrap().file, "c.epub");

        assert!(matches!(
            store.enqueue("a.pdf", QueueLane::Pdf),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            store.enqueue("  ", QueueLane::Pdf),
            Err(StoreError::Validation { .. })
        ));
        assert_eq!(store.queue().len(), 3);
    }

    #[test]
    fn test_valid_allocation_changes_only_that_domain() {
        for fraction in [0.0, 0.01, 0.33, 0.5, 0.999, 1.0] {
            let mut store = builtin_store();
            let before = store.domains().to_vec();

            store.set_domain_allocation("DeFi", fraction).unwrap();

            for (old, new) in before.iter().zip(store.domains()) {
                if old.name == "DeFi" {
                    assert_eq!(new.target_allocation, fraction);
                    assert_eq!(new.current_allocation, old.current_allocation);
                } else {
                    assert_eq!(old, new);
                }
            }
        }
    }

    #[test]
    fn test_invalid_allocation_is_rejected_and_state_unchanged() {
        for fraction in [-0.1, 1.0001, 2.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut store = builtin_store();
            let changes = record_changes(&mut store);
            let before = store.domains().to_vec();

            let result = store.set_domain_allocation("DeFi", fraction);

            assert!(
                matches!(result, Err(StoreError::Validation { .. })),
                "fraction {fraction} should be rejected, got {result:?}"
            );
            assert_eq!(store.domains(), before.as_slice());
            assert!(changes.borrow().is_empty());
        }
    }

    #[test]
    fn test_allocation_for_unknown_domain_is_not_found() {
        let mut store = builtin_store();
        assert!(matches!(
            store.set_domain_allocation("Astrology", 0.1),
            Err(StoreError::NotFound { kind: "domain", .. })
        ));
    }

    #[test]
    fn test_domain_config_updates_only_given_fields() {
        let mut store = builtin_store();
        let changes = record_changes(&mut store);
        let before = store.domain("DeFi").unwrap().clone();

        let changed = store
            .set_domain_config(
                "DeFi",
                DomainConfigUpdate {
                    min_quality: Some(0.9),
                    keywords: None,
                },
            )
            .unwrap();

        assert!(changed);
        let defi = store.domain("DeFi").unwrap();
        assert_eq!(defi.min_quality, 0.9);
        assert_eq!(defi.keywords, before.keywords);
        assert_eq!(defi.target_allocation, before.target_allocation);
        assert_eq!(*changes.borrow(), vec![Change::new(EntityKind::Domain, "DeFi")]);
    }

    #[test]
    fn test_domain_keywords_are_normalised_and_unchanged_is_noop() {
        let mut store = builtin_store();
        let update = DomainConfigUpdate {
            min_quality: None,
            keywords: Some(vec![" AMM ".into(), "amm".into(), "".into(), "lending".into()]),
        };

        assert!(store.set_domain_config("DeFi", update.clone()).unwrap());
        assert_eq!(store.domain("DeFi").unwrap().keywords, vec!["AMM", "lending"]);

        let changes = record_changes(&mut store);
        assert!(!store.set_domain_config("DeFi", update).unwrap());
        assert!(changes.borrow().is_empty());
    }

    #[test]
    fn test_invalid_domain_config_is_rejected_and_state_unchanged() {
        let mut store = builtin_store();
        let before = store.domains().to_vec();

        for min_quality in [-0.5, 1.5, f64::NAN] {
            let result = store.set_domain_config(
                "DeFi",
                DomainConfigUpdate {
                    min_quality: Some(min_quality),
                    keywords: Some(vec!["defi".into()]),
                },
            );
            assert!(matches!(result, Err(StoreError::Validation { .. })));
        }
        let too_many = (0..=MAX_DOMAIN_KEYWORDS).map(|i| format!("k{i}")).collect();
        assert!(matches!(
            store.set_domain_config(
                "DeFi",
                DomainConfigUpdate {
                    min_quality: None,
                    keywords: Some(too_many),
                },
            ),
            Err(StoreError::Validation { field: "keywords", .. })
        ));
        assert!(matches!(
            store.set_domain_config("Astrology", DomainConfigUpdate::default()),
            Err(StoreError::NotFound { kind: "domain", .. })
        ));
        assert_eq!(store.domains(), before.as_slice());
    }

    #[test]
    fn test_builtin_document_catalogue() {
        let store = builtin_store();
        assert_eq!(store.documents().len(), 5);
        assert_eq!(store.corpus_root(), "G:/corpus");

        let doc = store.document("bitcoin futures market analysis").unwrap();
        assert_eq!(doc.domain, "Crypto Derivatives");
        assert!(store.domain(&doc.domain).is_some());
        assert_eq!(
            corpus::storage_path(store.corpus_root(), doc),
            "G:/corpus/crypto_derivatives/bitcoin_futures_market_analysis.pdf"
        );
        assert_eq!(store.snapshot().documents.len(), 5);
    }

    #[test]
    fn test_rebalance_brings_every_domain_into_band() {
        let mut store = builtin_store();
        let adjusted = store.apply_rebalance(0.01);

        assert!(adjusted > 0);
        for domain in store.domains() {
            assert_eq!(
                balance::allocation_status(domain, 0.01),
                AllocationStatus::Balanced,
                "{} still unbalanced",
                domain.name
            );
        }
        assert_eq!(store.activity()[0].action, "Corpus rebalancing completed");
        assert_eq!(
            store.activity()[0].details,
            Some(format!("{adjusted} domains adjusted"))
        );
    }

    #[test]
    fn test_subscribers_see_entity_then_activity() {
        let mut store = builtin_store();
        let changes = record_changes(&mut store);

        store
            .set_collector_status("arXiv", CollectorStatus::Running)
            .unwrap();

        let changes = changes.borrow();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], Change::new(EntityKind::Collector, "arXiv"));
        assert_eq!(changes[1].kind, EntityKind::Activity);
        assert_eq!(changes[1].id, store.activity()[0].id.to_string());
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let mut store = builtin_store();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.subscribe(move |_| *sink.borrow_mut() += 1);

        store.set_domain_allocation("DeFi", 0.2).unwrap();
        assert_eq!(*count.borrow(), 1);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_domain_allocation("DeFi", 0.3).unwrap();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_stats_derive_from_contents() {
        let store = builtin_store();
        let stats = store.stats();
        assert_eq!(stats.total_documents, 2570);
        assert!((stats.average_quality - 0.82625).abs() < 1e-9);
        assert_eq!(stats.total_size_gb, 45.8);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.running_collectors, 1);
    }
}
